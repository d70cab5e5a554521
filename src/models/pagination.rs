//! Limit/offset pagination types

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Number of items per page (at least 1)
    pub limit: u32,
    /// Number of items to skip
    pub offset: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::from_query(None, None, None, &PaginationConfig::default())
    }
}

impl ListParams {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.max(1),
            offset,
        }
    }

    /// Build parameters from raw query values
    ///
    /// A missing or zero `limit` falls back to the configured default and is
    /// capped at the configured maximum. A 1-based `page` overrides `offset`.
    pub fn from_query(
        limit: Option<u32>,
        offset: Option<u32>,
        page: Option<u32>,
        config: &PaginationConfig,
    ) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(config.max_limit),
            _ => config.default_limit,
        };
        let offset = match page {
            Some(p) if p > 0 => (p - 1).saturating_mul(limit),
            _ => offset.unwrap_or(0),
        };
        Self::new(limit, offset)
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        self.offset as i64
    }

    /// Limit for database queries
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            limit: params.limit,
            offset: params.offset,
        }
    }

    /// Offset of the next page, if there is one
    pub fn next_offset(&self) -> Option<u32> {
        let next = self.offset as i64 + self.limit as i64;
        (next < self.total).then_some(next as u32)
    }

    /// Offset of the previous page, if there is one
    pub fn previous_offset(&self) -> Option<u32> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }

    /// Convert the items, keeping the paging metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
