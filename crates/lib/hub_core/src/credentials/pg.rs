//! PostgreSQL-backed credential store.
//!
//! One-per-account and key uniqueness are enforced by the
//! `api_keys_user_unique` and `api_keys_key_unique` constraints; this module
//! only translates their violations into [`CredentialError`] variants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CredentialError, CredentialStore, generate_key, looks_like_key};
use crate::models::credentials::{Credential, KeyOwner};
use crate::uuid::uuidv7;

/// Attempts per write before giving up on key generation (first try + one retry).
const KEY_ATTEMPTS: u32 = 2;

const USER_CONSTRAINT: &str = "api_keys_user_unique";
const KEY_CONSTRAINT: &str = "api_keys_key_unique";

const COLUMNS: &str = "id, user_id::text, key, created_at, is_active, usage_count";

type CredentialRow = (Uuid, String, String, DateTime<Utc>, bool, i64);

fn credential_from_row(
    (id, user_id, key, created_at, is_active, usage_count): CredentialRow,
) -> Credential {
    Credential {
        id,
        user_id,
        key,
        created_at,
        is_active,
        usage_count,
    }
}

/// Which constraint a failed write tripped.
#[derive(Debug, PartialEq, Eq)]
enum Conflict {
    Key,
    Account,
    MissingAccount,
    Other,
}

fn conflict_of(err: &sqlx::Error) -> Conflict {
    let sqlx::Error::Database(db) = err else {
        return Conflict::Other;
    };
    if db.is_foreign_key_violation() {
        return Conflict::MissingAccount;
    }
    if !db.is_unique_violation() {
        return Conflict::Other;
    }
    match db.constraint() {
        Some(KEY_CONSTRAINT) => Conflict::Key,
        Some(USER_CONSTRAINT) => Conflict::Account,
        _ => Conflict::Other,
    }
}

/// Credential store over the `api_keys` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn issue(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let sql = format!(
            "INSERT INTO api_keys (id, user_id, key) VALUES ($1, $2::uuid, $3) RETURNING {COLUMNS}"
        );
        for attempt in 1..=KEY_ATTEMPTS {
            let result = sqlx::query_as::<_, CredentialRow>(&sql)
                .bind(uuidv7())
                .bind(user_id)
                .bind(generate_key())
                .fetch_one(&self.pool)
                .await;
            match result {
                Ok(row) => {
                    info!(user_id, "issued API key");
                    return Ok(credential_from_row(row));
                }
                Err(e) => match conflict_of(&e) {
                    Conflict::Key => warn!(user_id, attempt, "API key collision, regenerating"),
                    Conflict::Account => return Err(CredentialError::AlreadyExists),
                    Conflict::MissingAccount => {
                        return Err(CredentialError::UnknownAccount(user_id.to_string()));
                    }
                    Conflict::Other => return Err(e.into()),
                },
            }
        }
        Err(CredentialError::Generation)
    }

    async fn get_or_create(&self, user_id: &str) -> Result<(Credential, bool), CredentialError> {
        let insert = format!(
            "INSERT INTO api_keys (id, user_id, key) VALUES ($1, $2::uuid, $3) \
             ON CONFLICT ON CONSTRAINT {USER_CONSTRAINT} DO NOTHING \
             RETURNING {COLUMNS}"
        );
        for attempt in 1..=KEY_ATTEMPTS {
            if let Some(existing) = self.find(user_id).await? {
                return Ok((existing, false));
            }
            let result = sqlx::query_as::<_, CredentialRow>(&insert)
                .bind(uuidv7())
                .bind(user_id)
                .bind(generate_key())
                .fetch_optional(&self.pool)
                .await;
            match result {
                Ok(Some(row)) => {
                    info!(user_id, "created API key");
                    return Ok((credential_from_row(row), true));
                }
                // Another request inserted first; its row wins.
                Ok(None) => {
                    if let Some(winner) = self.find(user_id).await? {
                        return Ok((winner, false));
                    }
                    debug!(user_id, attempt, "winning API key vanished before read, retrying");
                }
                Err(e) => match conflict_of(&e) {
                    Conflict::Key => warn!(user_id, attempt, "API key collision, regenerating"),
                    Conflict::MissingAccount => {
                        return Err(CredentialError::UnknownAccount(user_id.to_string()));
                    }
                    Conflict::Account | Conflict::Other => return Err(e.into()),
                },
            }
        }
        Err(CredentialError::Generation)
    }

    async fn rotate(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let sql = format!(
            "UPDATE api_keys SET key = $2, usage_count = 0 \
             WHERE user_id = $1::uuid RETURNING {COLUMNS}"
        );
        for attempt in 1..=KEY_ATTEMPTS {
            let result = sqlx::query_as::<_, CredentialRow>(&sql)
                .bind(user_id)
                .bind(generate_key())
                .fetch_optional(&self.pool)
                .await;
            match result {
                Ok(Some(row)) => {
                    info!(user_id, "rotated API key");
                    return Ok(credential_from_row(row));
                }
                Ok(None) => return Err(CredentialError::NotFound),
                Err(e) if conflict_of(&e) == Conflict::Key => {
                    warn!(user_id, attempt, "API key collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CredentialError::Generation)
    }

    async fn validate(&self, key: &str) -> Result<KeyOwner, CredentialError> {
        if !looks_like_key(key) {
            return Err(CredentialError::InvalidOrInactive);
        }
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT k.id, u.id::text, u.username \
             FROM api_keys k \
             JOIN users u ON u.id = k.user_id \
             WHERE k.key = $1 AND k.is_active",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(credential_id, user_id, username)| KeyOwner {
            credential_id,
            user_id,
            username,
        })
        .ok_or(CredentialError::InvalidOrInactive)
    }

    async fn record_usage(&self, credential_id: Uuid) -> Result<(), CredentialError> {
        let result = sqlx::query("UPDATE api_keys SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(credential_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            debug!(%credential_id, "usage not recorded, API key no longer exists");
        }
        Ok(())
    }

    async fn find(&self, user_id: &str) -> Result<Option<Credential>, CredentialError> {
        let sql = format!("SELECT {COLUMNS} FROM api_keys WHERE user_id = $1::uuid");
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(credential_from_row))
    }

    async fn set_active(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<Credential, CredentialError> {
        let sql = format!(
            "UPDATE api_keys SET is_active = $2 WHERE user_id = $1::uuid RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(user_id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CredentialError::NotFound)?;
        info!(user_id, active, "changed API key state");
        Ok(credential_from_row(row))
    }
}
