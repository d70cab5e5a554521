//! Common API utilities and shared types
//!
//! Query-string parsing that keeps repeated keys (`?tags=a&tags=b`),
//! limit/offset pagination and the absolute URLs used in paginated
//! responses and short links.

use axum::http::{header, HeaderMap, Uri};
use serde::Serialize;

use crate::config::{PaginationConfig, ServerConfig};
use crate::models::{ListParams, PagedResult};

/// Query keys that pagination links rewrite
const PAGINATION_KEYS: [&str; 3] = ["limit", "offset", "page"];

// ============================================================================
// Query Parsing
// ============================================================================

/// Decoded `key=value` pairs in request order
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .unwrap_or_default()
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self(pairs)
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value for `key`
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// `key` parsed as a number; malformed values count as absent
    pub fn number<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// `1` and `true` are truthy
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key).map(str::trim), Some("1") | Some("true") | Some("True"))
    }

    /// Pagination parameters
    pub fn list_params(&self, config: &PaginationConfig) -> ListParams {
        ListParams::from_query(
            self.number("limit"),
            self.number("offset"),
            self.number("page"),
            config,
        )
    }
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|c| c.into_owned())
        .unwrap_or(s)
}

// ============================================================================
// Absolute URLs
// ============================================================================

/// Scheme and host clients should use to reach this server
///
/// `server.public_url` wins; otherwise the request `Host` header, with the
/// scheme taken from `X-Forwarded-Proto`.
pub fn base_url(headers: &HeaderMap, server: &ServerConfig) -> String {
    if let Some(url) = server.public_url.as_deref().filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .filter(|p| *p == "https")
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

// ============================================================================
// Pagination Response
// ============================================================================

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Build links to the neighbouring pages of `page`, keeping the other
    /// query parameters of the request
    pub fn new(page: PagedResult<T>, base: &str, uri: &Uri) -> Self {
        let link = |offset: u32| page_url(base, uri, page.limit, offset);
        let next = page.next_offset().map(link);
        let previous = page.previous_offset().map(link);

        Self {
            count: page.total,
            next,
            previous,
            results: page.items,
        }
    }
}

fn page_url(base: &str, uri: &Uri, limit: u32, offset: u32) -> String {
    let mut query: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|part| !part.is_empty())
        .filter(|part| {
            let key = part.split_once('=').map_or(*part, |(k, _)| k);
            !PAGINATION_KEYS.contains(&key)
        })
        .map(str::to_string)
        .collect();
    query.push(format!("limit={}", limit));
    query.push(format!("offset={}", offset));

    format!("{}{}?{}", base, uri.path(), query.join("&"))
}
