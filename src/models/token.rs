//! Auth token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque API token issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Token value (uuid v4 string)
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
