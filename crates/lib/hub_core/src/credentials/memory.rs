//! In-process credential store.
//!
//! All state sits behind one async mutex, so get-or-create and uniqueness
//! checks are trivially atomic. Accounts must be registered with
//! [`MemoryCredentialStore::add_account`] before keys can be issued, the same
//! way the Postgres store needs an existing `users` row.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialError, CredentialStore, generate_key, looks_like_key};
use crate::models::credentials::{Credential, KeyOwner};
use crate::uuid::uuidv7;

#[derive(Debug, Default)]
struct State {
    /// user_id → username
    accounts: HashMap<String, String>,
    /// user_id → credential
    by_account: HashMap<String, Credential>,
    /// key → user_id
    by_key: HashMap<String, String>,
}

impl State {
    fn fresh_key(&self) -> Result<String, CredentialError> {
        let key = generate_key();
        if !self.by_key.contains_key(&key) {
            return Ok(key);
        }
        let retry = generate_key();
        if self.by_key.contains_key(&retry) {
            return Err(CredentialError::Generation);
        }
        Ok(retry)
    }

    fn insert_new(&mut self, user_id: &str) -> Result<Credential, CredentialError> {
        if !self.accounts.contains_key(user_id) {
            return Err(CredentialError::UnknownAccount(user_id.to_string()));
        }
        let credential = Credential {
            id: uuidv7(),
            user_id: user_id.to_string(),
            key: self.fresh_key()?,
            created_at: Utc::now(),
            is_active: true,
            usage_count: 0,
        };
        self.by_key
            .insert(credential.key.clone(), user_id.to_string());
        self.by_account
            .insert(user_id.to_string(), credential.clone());
        Ok(credential)
    }
}

/// Credential store kept in memory; contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<State>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account that may own a key.
    pub async fn add_account(&self, user_id: &str, username: &str) {
        self.state
            .lock()
            .await
            .accounts
            .insert(user_id.to_string(), username.to_string());
    }

    /// Remove an account and, like the cascading foreign key, its key.
    pub async fn remove_account(&self, user_id: &str) {
        let mut state = self.state.lock().await;
        state.accounts.remove(user_id);
        if let Some(credential) = state.by_account.remove(user_id) {
            state.by_key.remove(&credential.key);
        }
    }

    /// Number of stored credentials.
    pub async fn len(&self) -> usize {
        self.state.lock().await.by_account.len()
    }

    /// Whether no credentials are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn issue(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let mut state = self.state.lock().await;
        if state.by_account.contains_key(user_id) {
            return Err(CredentialError::AlreadyExists);
        }
        state.insert_new(user_id)
    }

    async fn get_or_create(&self, user_id: &str) -> Result<(Credential, bool), CredentialError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.by_account.get(user_id) {
            return Ok((existing.clone(), false));
        }
        state.insert_new(user_id).map(|c| (c, true))
    }

    async fn rotate(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let mut state = self.state.lock().await;
        let old_key = state
            .by_account
            .get(user_id)
            .map(|c| c.key.clone())
            .ok_or(CredentialError::NotFound)?;
        let new_key = state.fresh_key()?;

        state.by_key.remove(&old_key);
        state.by_key.insert(new_key.clone(), user_id.to_string());
        let credential = state
            .by_account
            .get_mut(user_id)
            .ok_or(CredentialError::NotFound)?;
        credential.key = new_key;
        credential.usage_count = 0;
        Ok(credential.clone())
    }

    async fn validate(&self, key: &str) -> Result<KeyOwner, CredentialError> {
        if !looks_like_key(key) {
            return Err(CredentialError::InvalidOrInactive);
        }
        let state = self.state.lock().await;
        let credential = state
            .by_key
            .get(key)
            .and_then(|user_id| state.by_account.get(user_id))
            .filter(|c| c.is_active)
            .ok_or(CredentialError::InvalidOrInactive)?;
        let username = state
            .accounts
            .get(&credential.user_id)
            .cloned()
            .ok_or(CredentialError::InvalidOrInactive)?;
        Ok(KeyOwner {
            credential_id: credential.id,
            user_id: credential.user_id.clone(),
            username,
        })
    }

    async fn record_usage(&self, credential_id: Uuid) -> Result<(), CredentialError> {
        let mut state = self.state.lock().await;
        if let Some(credential) = state
            .by_account
            .values_mut()
            .find(|c| c.id == credential_id)
        {
            credential.usage_count = credential.usage_count.saturating_add(1);
        }
        Ok(())
    }

    async fn find(&self, user_id: &str) -> Result<Option<Credential>, CredentialError> {
        Ok(self.state.lock().await.by_account.get(user_id).cloned())
    }

    async fn set_active(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<Credential, CredentialError> {
        let mut state = self.state.lock().await;
        let credential = state
            .by_account
            .get_mut(user_id)
            .ok_or(CredentialError::NotFound)?;
        credential.is_active = active;
        Ok(credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(user_id: &str) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.add_account(user_id, "ada").await;
        store
    }

    #[tokio::test]
    async fn issue_twice_fails_with_already_exists() {
        let store = store_with("u1").await;
        store.issue("u1").await.unwrap();
        assert!(matches!(
            store.issue("u1").await,
            Err(CredentialError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn issue_for_unknown_account_fails() {
        let store = MemoryCredentialStore::new();
        assert!(matches!(
            store.issue("ghost").await,
            Err(CredentialError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn get_or_create_returns_existing_on_second_call() {
        let store = store_with("u1").await;
        let (first, created) = store.get_or_create("u1").await.unwrap();
        assert!(created);
        let (second, created) = store.get_or_create("u1").await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rotate_changes_key_and_resets_usage_but_keeps_active_flag() {
        let store = store_with("u1").await;
        let original = store.issue("u1").await.unwrap();
        store.record_usage(original.id).await.unwrap();
        store.set_active("u1", false).await.unwrap();

        let rotated = store.rotate("u1").await.unwrap();
        assert_ne!(rotated.key, original.key);
        assert_eq!(rotated.usage_count, 0);
        assert!(!rotated.is_active);
        assert_eq!(rotated.id, original.id);
    }

    #[tokio::test]
    async fn rotate_without_credential_is_not_found() {
        let store = store_with("u1").await;
        assert!(matches!(
            store.rotate("u1").await,
            Err(CredentialError::NotFound)
        ));
    }

    #[tokio::test]
    async fn old_key_stops_validating_after_rotation() {
        let store = store_with("u1").await;
        let original = store.issue("u1").await.unwrap();
        let rotated = store.rotate("u1").await.unwrap();
        assert!(store.validate(&original.key).await.is_err());
        assert_eq!(store.validate(&rotated.key).await.unwrap().user_id, "u1");
    }

    #[tokio::test]
    async fn validate_rejects_inactive_wrong_and_malformed_keys() {
        let store = store_with("u1").await;
        let credential = store.issue("u1").await.unwrap();

        let owner = store.validate(&credential.key).await.unwrap();
        assert_eq!(owner.user_id, "u1");
        assert_eq!(owner.username, "ada");
        assert_eq!(owner.credential_id, credential.id);

        for bad in [generate_key(), "garbage".to_string(), String::new()] {
            assert!(matches!(
                store.validate(&bad).await,
                Err(CredentialError::InvalidOrInactive)
            ));
        }

        store.set_active("u1", false).await.unwrap();
        assert!(matches!(
            store.validate(&credential.key).await,
            Err(CredentialError::InvalidOrInactive)
        ));
    }

    #[tokio::test]
    async fn record_usage_counts_each_call() {
        let store = store_with("u1").await;
        let credential = store.issue("u1").await.unwrap();
        for _ in 0..5 {
            store.record_usage(credential.id).await.unwrap();
        }
        let reread = store.find("u1").await.unwrap().unwrap();
        assert_eq!(reread.usage_count, 5);
    }

    #[tokio::test]
    async fn record_usage_for_missing_credential_is_a_no_op() {
        let store = MemoryCredentialStore::new();
        store.record_usage(uuidv7()).await.unwrap();
    }

    #[tokio::test]
    async fn removing_account_cascades_to_key() {
        let store = store_with("u1").await;
        let credential = store.issue("u1").await.unwrap();
        store.remove_account("u1").await;
        assert!(store.is_empty().await);
        assert!(store.validate(&credential.key).await.is_err());
    }
}
