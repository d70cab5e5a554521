//! Foodgram - A recipe sharing backend
//!
//! This library provides the core functionality behind the `foodgram` server
//! and the `load-data` import tool: configuration, storage, caching, domain
//! services and the HTTP API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
