//! Per-account API keys.
//!
//! Each account owns at most one [`Credential`]. The [`CredentialStore`]
//! trait is the only way keys are created, rotated, validated, or counted;
//! [`PgCredentialStore`] backs production and [`MemoryCredentialStore`]
//! serves tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use rand::distr::{Alphanumeric, Distribution};
use rand::rng;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryCredentialStore;
pub use pg::PgCredentialStore;

use crate::models::credentials::{Credential, KeyOwner};

/// Literal prefix on every issued key.
pub const KEY_PREFIX: &str = "sk_";

/// Number of random characters after [`KEY_PREFIX`].
pub const KEY_RANDOM_LEN: usize = 48;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("API key already exists for this account")]
    AlreadyExists,

    #[error("No API key exists for this account")]
    NotFound,

    #[error("API key is invalid or inactive")]
    InvalidOrInactive,

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Could not generate a unique API key")]
    Generation,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Storage for API keys.
///
/// Implementations enforce one credential per account and globally unique
/// key strings.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a credential for `user_id`. Fails with `AlreadyExists` if one exists.
    async fn issue(&self, user_id: &str) -> Result<Credential, CredentialError>;

    /// Return the account's credential, creating it if absent.
    ///
    /// Concurrent callers for one account all observe the same credential;
    /// exactly one of them sees `was_created == true`.
    async fn get_or_create(&self, user_id: &str) -> Result<(Credential, bool), CredentialError>;

    /// Replace the key value and reset usage to zero. The active flag is kept.
    async fn rotate(&self, user_id: &str) -> Result<Credential, CredentialError>;

    /// Resolve an exact, active key to its owner.
    async fn validate(&self, key: &str) -> Result<KeyOwner, CredentialError>;

    /// Increment the usage counter of one credential by one.
    async fn record_usage(&self, credential_id: Uuid) -> Result<(), CredentialError>;

    /// Read the account's credential, if any.
    async fn find(&self, user_id: &str) -> Result<Option<Credential>, CredentialError>;

    /// Activate or deactivate the account's credential.
    async fn set_active(&self, user_id: &str, active: bool)
    -> Result<Credential, CredentialError>;
}

/// Generate a fresh key: [`KEY_PREFIX`] followed by [`KEY_RANDOM_LEN`]
/// alphanumeric characters from the thread-local CSPRNG.
pub fn generate_key() -> String {
    let mut key = String::with_capacity(KEY_PREFIX.len() + KEY_RANDOM_LEN);
    key.push_str(KEY_PREFIX);
    key.extend(
        Alphanumeric
            .sample_iter(rng())
            .take(KEY_RANDOM_LEN)
            .map(char::from),
    );
    key
}

/// Cheap shape check applied before any store lookup.
pub fn looks_like_key(candidate: &str) -> bool {
    candidate.strip_prefix(KEY_PREFIX).is_some_and(|rest| {
        rest.len() == KEY_RANDOM_LEN && rest.bytes().all(|b| b.is_ascii_alphanumeric())
    })
}
