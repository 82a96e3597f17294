//! API key (credential) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One account's API key.
///
/// At most one exists per account. `key` is unique across all credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub user_id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub usage_count: i64,
}

/// The account resolved from a presented API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOwner {
    pub credential_id: Uuid,
    pub user_id: String,
    pub username: String,
}
