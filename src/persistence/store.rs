//! Credential Store
//!
//! Lookup port over users and their per-provider credential records, and an
//! in-memory implementation for development and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::OAuth2Result;
use crate::persistence::CredentialRecord;
use crate::types::{TokenBag, DEFAULT_STORAGE_ATTR};

/// A user known to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    /// Secondary key assigned by login providers, `"<provider>_<subject>"`.
    pub uid: Option<String>,
}

/// Users and their credential records.
///
/// `find_or_create_user_by_uid` and `find_or_initialize_credentials` must be
/// atomic per key: concurrent callers observe one user and one record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by id.
    async fn find_user(&self, user_id: &str) -> OAuth2Result<Option<UserRecord>>;

    /// Look up a user by uid, creating it if absent.
    async fn find_or_create_user_by_uid(&self, uid: &str) -> OAuth2Result<UserRecord>;

    /// The user's credential record for a provider, if one was persisted.
    async fn find_credentials(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> OAuth2Result<Option<Box<dyn CredentialRecord>>>;

    /// The user's credential record for a provider, or a new unsaved one.
    async fn find_or_initialize_credentials(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> OAuth2Result<Box<dyn CredentialRecord>>;
}

type CredentialKey = (String, String);

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<String, UserRecord>,
    uids: HashMap<String, String>,
    credentials: HashMap<CredentialKey, Option<TokenBag>>,
    next_user_id: u64,
    writes: usize,
}

impl StoreState {
    fn insert_user(&mut self, uid: Option<&str>) -> UserRecord {
        self.next_user_id += 1;
        let user = UserRecord {
            id: self.next_user_id.to_string(),
            uid: uid.map(str::to_string),
        };
        if let Some(uid) = uid {
            self.uids.insert(uid.to_string(), user.id.clone());
        }
        self.users.insert(user.id.clone(), user.clone());
        user
    }
}

/// In-memory credential store.
///
/// Records it hands out write back into the store when persisted.
#[derive(Clone)]
pub struct InMemoryCredentialStore {
    state: Arc<Mutex<StoreState>>,
    storage_attr: String,
}

impl InMemoryCredentialStore {
    /// Create an empty store whose records use the default storage field.
    pub fn new() -> Self {
        Self::with_storage_attr(DEFAULT_STORAGE_ATTR)
    }

    /// Create an empty store whose records expose the given storage field.
    pub fn with_storage_attr(storage_attr: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            storage_attr: storage_attr.into(),
        }
    }

    /// Add a user.
    pub fn create_user(&self, uid: Option<&str>) -> UserRecord {
        self.state.lock().insert_user(uid)
    }

    /// Look up a user by uid without creating one.
    pub fn user_by_uid(&self, uid: &str) -> Option<UserRecord> {
        let state = self.state.lock();
        state
            .uids
            .get(uid)
            .and_then(|id| state.users.get(id))
            .cloned()
    }

    /// Persisted token bag of a user's record, if the record exists.
    pub fn stored_tokens(&self, user_id: &str, provider_name: &str) -> Option<TokenBag> {
        self.state
            .lock()
            .credentials
            .get(&(user_id.to_string(), provider_name.to_string()))
            .cloned()
            .flatten()
    }

    /// Seed a persisted record.
    pub fn put_tokens(&self, user_id: &str, provider_name: &str, bag: TokenBag) {
        self.state
            .lock()
            .credentials
            .insert((user_id.to_string(), provider_name.to_string()), Some(bag));
    }

    /// Number of record writes so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    fn record(&self, key: CredentialKey, tokens: Option<TokenBag>) -> Box<dyn CredentialRecord> {
        Box::new(InMemoryCredentialRecord {
            state: self.state.clone(),
            storage_attr: self.storage_attr.clone(),
            user_id: key.0,
            provider_name: key.1,
            tokens,
        })
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryCredentialStore")
            .field("storage_attr", &self.storage_attr)
            .field("users", &state.users.len())
            .field("credentials", &state.credentials.len())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user(&self, user_id: &str) -> OAuth2Result<Option<UserRecord>> {
        Ok(self.state.lock().users.get(user_id).cloned())
    }

    async fn find_or_create_user_by_uid(&self, uid: &str) -> OAuth2Result<UserRecord> {
        let mut state = self.state.lock();
        if let Some(user) = state.uids.get(uid).and_then(|id| state.users.get(id)) {
            return Ok(user.clone());
        }
        Ok(state.insert_user(Some(uid)))
    }

    async fn find_credentials(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> OAuth2Result<Option<Box<dyn CredentialRecord>>> {
        let key = (user_id.to_string(), provider_name.to_string());
        let tokens = self.state.lock().credentials.get(&key).cloned();
        Ok(tokens.map(|tokens| self.record(key, tokens)))
    }

    async fn find_or_initialize_credentials(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> OAuth2Result<Box<dyn CredentialRecord>> {
        let key = (user_id.to_string(), provider_name.to_string());
        let tokens = self.state.lock().credentials.get(&key).cloned().flatten();
        Ok(self.record(key, tokens))
    }
}

/// Credential record backed by an [`InMemoryCredentialStore`].
pub struct InMemoryCredentialRecord {
    state: Arc<Mutex<StoreState>>,
    storage_attr: String,
    user_id: String,
    provider_name: String,
    tokens: Option<TokenBag>,
}

impl InMemoryCredentialRecord {
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

impl std::fmt::Debug for InMemoryCredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialRecord")
            .field("user_id", &self.user_id)
            .field("provider_name", &self.provider_name)
            .field("storage_attr", &self.storage_attr)
            .field(
                "keys",
                &self.tokens.as_ref().map(|t| t.keys().collect::<Vec<_>>()),
            )
            .finish()
    }
}

#[async_trait]
impl CredentialRecord for InMemoryCredentialRecord {
    fn has_storage_attr(&self, storage_attr: &str) -> bool {
        self.storage_attr == storage_attr
    }

    fn storage(&self, storage_attr: &str) -> Option<TokenBag> {
        if storage_attr != self.storage_attr {
            return None;
        }
        self.tokens.clone()
    }

    fn set_storage(&mut self, storage_attr: &str, bag: TokenBag) {
        if storage_attr == self.storage_attr {
            self.tokens = Some(bag);
        }
    }

    async fn persist(&mut self) -> OAuth2Result<()> {
        let mut state = self.state.lock();
        state.credentials.insert(
            (self.user_id.clone(), self.provider_name.clone()),
            self.tokens.clone(),
        );
        state.writes += 1;
        Ok(())
    }

    fn user_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}
