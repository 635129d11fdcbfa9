//! Persistent cache of accounts, tokens, and pending logins.
//!
//! The identity client keeps its state in a string key/value store so it
//! survives the full-page redirect to the provider and back. In the browser
//! that store is `sessionStorage`; tests and native hosts use
//! [`MemoryStorage`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::account::{Account, AccountId};
use crate::error::IdentityError;

/// Tokens are renewed when they expire within this window.
pub const DEFAULT_REFRESH_BUFFER_MINUTES: i64 = 5;

/// A string key/value store.
pub trait CacheStorage: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), IdentityError>;

    /// Removes `key` if present.
    fn remove(&self, key: &str) -> Result<(), IdentityError>;
}

/// In-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), IdentityError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), IdentityError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Tokens cached for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTokens {
    /// The current access token.
    pub access_token: String,
    /// Refresh token for silent renewal.
    pub refresh_token: Option<String>,
    /// Scopes the access token was issued for.
    pub scopes: Vec<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedTokens {
    /// Returns true if the access token expires within `buffer` of `now`.
    #[must_use]
    pub fn is_expiring(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires) => expires <= now + buffer,
            None => false,
        }
    }

    /// Returns true if the access token carries every requested scope.
    #[must_use]
    pub fn covers(&self, requested: &[String]) -> bool {
        requested.iter().all(|wanted| {
            self.scopes
                .iter()
                .any(|granted| granted.eq_ignore_ascii_case(wanted))
        })
    }
}

/// A login started with `login_redirect` that has not come back yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub nonce: String,
    pub scopes: Vec<String>,
    pub started_at: DateTime<Utc>,
}

/// Typed view over a [`CacheStorage`].
///
/// Keys are namespaced by client ID so several applications can share one
/// browser origin.
#[derive(Clone)]
pub struct IdentityCache {
    storage: Arc<dyn CacheStorage>,
    namespace: String,
}

impl IdentityCache {
    /// Creates a cache for the given client ID.
    #[must_use]
    pub fn new(storage: Arc<dyn CacheStorage>, client_id: &str) -> Self {
        Self {
            storage,
            namespace: format!("kcloft.{client_id}"),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}.{}", self.namespace, suffix)
    }

    fn tokens_key(&self, account_id: &AccountId) -> String {
        self.key(&format!("tokens.{account_id}"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, IdentityError> {
        match self.storage.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| IdentityError::Storage {
                    reason: format!("corrupt cache entry '{key}': {e}"),
                }),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), IdentityError> {
        let raw = serde_json::to_string(value).map_err(|e| IdentityError::Storage {
            reason: format!("failed to serialize cache entry '{key}': {e}"),
        })?;
        self.storage.set(key, &raw)
    }

    /// Returns all cached accounts in the order they first signed in.
    pub fn accounts(&self) -> Result<Vec<Account>, IdentityError> {
        Ok(self.read(&self.key("accounts"))?.unwrap_or_default())
    }

    /// Adds an account, replacing any cached account with the same ID.
    pub fn upsert_account(&self, account: &Account) -> Result<(), IdentityError> {
        let mut accounts = self.accounts()?;
        match accounts.iter_mut().find(|a| a.id() == account.id()) {
            Some(existing) => *existing = account.clone(),
            None => accounts.push(account.clone()),
        }
        self.write(&self.key("accounts"), &accounts)
    }

    /// Removes an account and its tokens.
    pub fn remove_account(&self, account_id: &AccountId) -> Result<(), IdentityError> {
        let mut accounts = self.accounts()?;
        accounts.retain(|a| a.id() != account_id);
        self.write(&self.key("accounts"), &accounts)?;
        self.storage.remove(&self.tokens_key(account_id))?;
        if self.active_account_id()?.as_ref() == Some(account_id) {
            self.set_active_account_id(None)?;
        }
        Ok(())
    }

    /// Returns the ID of the active account.
    pub fn active_account_id(&self) -> Result<Option<AccountId>, IdentityError> {
        self.read(&self.key("active_account"))
    }

    /// Sets or clears the active account ID.
    pub fn set_active_account_id(&self, id: Option<&AccountId>) -> Result<(), IdentityError> {
        match id {
            Some(id) => self.write(&self.key("active_account"), id),
            None => self.storage.remove(&self.key("active_account")),
        }
    }

    /// Returns the tokens cached for an account.
    pub fn tokens(&self, account_id: &AccountId) -> Result<Option<CachedTokens>, IdentityError> {
        self.read(&self.tokens_key(account_id))
    }

    /// Stores tokens for an account.
    pub fn store_tokens(
        &self,
        account_id: &AccountId,
        tokens: &CachedTokens,
    ) -> Result<(), IdentityError> {
        self.write(&self.tokens_key(account_id), tokens)
    }

    /// Returns the pending login, if any.
    pub fn pending_authorization(&self) -> Result<Option<PendingAuthorization>, IdentityError> {
        self.read(&self.key("interaction"))
    }

    /// Records a pending login.
    pub fn set_pending_authorization(
        &self,
        pending: &PendingAuthorization,
    ) -> Result<(), IdentityError> {
        self.write(&self.key("interaction"), pending)
    }

    /// Removes and returns the pending login.
    pub fn take_pending_authorization(
        &self,
    ) -> Result<Option<PendingAuthorization>, IdentityError> {
        let pending = self.pending_authorization()?;
        self.storage.remove(&self.key("interaction"))?;
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> (IdentityCache, MemoryStorage) {
        let storage = MemoryStorage::new();
        let cache = IdentityCache::new(Arc::new(storage.clone()), "client-id");
        (cache, storage)
    }

    fn account(id: &str) -> Account {
        Account::new(AccountId::new(id), "login.example.com")
    }

    fn tokens(expires_at: Option<DateTime<Utc>>) -> CachedTokens {
        CachedTokens {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            scopes: vec!["User.Read".to_string()],
            expires_at,
        }
    }

    #[test]
    fn accounts_keep_sign_in_order_and_upsert_in_place() {
        let (cache, _) = test_cache();
        cache.upsert_account(&account("a")).unwrap();
        cache.upsert_account(&account("b")).unwrap();
        cache
            .upsert_account(&account("a").with_name(Some("Alice".to_string())))
            .unwrap();

        let accounts = cache.accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id().as_str(), "a");
        assert_eq!(accounts[0].name(), Some("Alice"));
        assert_eq!(accounts[1].id().as_str(), "b");
    }

    #[test]
    fn remove_account_clears_tokens_and_active_selection() {
        let (cache, _) = test_cache();
        let alice = account("a");
        cache.upsert_account(&alice).unwrap();
        cache.set_active_account_id(Some(alice.id())).unwrap();
        cache.store_tokens(alice.id(), &tokens(None)).unwrap();

        cache.remove_account(alice.id()).unwrap();

        assert!(cache.accounts().unwrap().is_empty());
        assert!(cache.tokens(alice.id()).unwrap().is_none());
        assert!(cache.active_account_id().unwrap().is_none());
    }

    #[test]
    fn pending_authorization_is_taken_once() {
        let (cache, _) = test_cache();
        let pending = PendingAuthorization {
            csrf_token: "state".to_string(),
            pkce_verifier: "verifier".to_string(),
            nonce: "nonce".to_string(),
            scopes: vec!["openid".to_string()],
            started_at: Utc::now(),
        };
        cache.set_pending_authorization(&pending).unwrap();

        assert_eq!(cache.take_pending_authorization().unwrap(), Some(pending));
        assert_eq!(cache.take_pending_authorization().unwrap(), None);
    }

    #[test]
    fn keys_are_namespaced_by_client() {
        let (cache, storage) = test_cache();
        cache.upsert_account(&account("a")).unwrap();
        assert!(
            storage
                .get("kcloft.client-id.accounts")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn corrupt_entry_is_a_storage_error() {
        let (cache, storage) = test_cache();
        storage.set("kcloft.client-id.accounts", "not json").unwrap();
        let err = cache.accounts().unwrap_err();
        assert!(matches!(err, IdentityError::Storage { .. }));
    }

    #[test]
    fn token_expiry_uses_buffer() {
        let now = Utc::now();
        let buffer = Duration::minutes(DEFAULT_REFRESH_BUFFER_MINUTES);

        assert!(!tokens(None).is_expiring(now, buffer));
        assert!(!tokens(Some(now + Duration::hours(1))).is_expiring(now, buffer));
        assert!(tokens(Some(now + Duration::minutes(2))).is_expiring(now, buffer));
        assert!(tokens(Some(now - Duration::minutes(1))).is_expiring(now, buffer));
    }

    #[test]
    fn token_scope_coverage() {
        let cached = tokens(None);
        assert!(cached.covers(&["user.read".to_string()]));
        assert!(!cached.covers(&["Files.Read".to_string()]));
    }
}
