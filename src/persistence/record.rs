//! Credential Records
//!
//! A credential record stores a bag of token attributes under one named field.
//! [`CredentialWrapper`] checks at construction that the record actually has
//! the configured field, so the save and load steps never meet a record they
//! cannot write to.

use async_trait::async_trait;

use crate::error::{OAuth2Result, StorageError};
use crate::types::TokenBag;

/// A persisted record holding token state for one user and provider.
#[async_trait]
pub trait CredentialRecord: Send + Sync + std::fmt::Debug {
    /// Whether the record has a token bag field with this name.
    fn has_storage_attr(&self, storage_attr: &str) -> bool;

    /// Current contents of the named field, `None` when it is unset.
    fn storage(&self, storage_attr: &str) -> Option<TokenBag>;

    /// Replace the contents of the named field.
    fn set_storage(&mut self, storage_attr: &str, bag: TokenBag);

    /// Write the record to its backing store.
    async fn persist(&mut self) -> OAuth2Result<()>;

    /// Id of the user owning the record, when the backend tracks one.
    fn user_id(&self) -> Option<&str> {
        None
    }
}

/// A credential record bound to the configured storage field.
///
/// An empty wrapper stands in when no record could be found; reads return
/// nothing and writes are dropped.
#[derive(Debug)]
pub struct CredentialWrapper {
    record: Option<Box<dyn CredentialRecord>>,
    storage_attr: String,
}

impl CredentialWrapper {
    /// Wrap a record, failing if it does not expose `storage_attr`.
    pub fn new(record: Box<dyn CredentialRecord>, storage_attr: impl Into<String>) -> OAuth2Result<Self> {
        let storage_attr = storage_attr.into();
        if !record.has_storage_attr(&storage_attr) {
            return Err(StorageError::UnsupportedStorageAttr { storage_attr }.into());
        }
        Ok(Self {
            record: Some(record),
            storage_attr,
        })
    }

    /// Wrapper with no record behind it.
    pub fn empty(storage_attr: impl Into<String>) -> Self {
        Self {
            record: None,
            storage_attr: storage_attr.into(),
        }
    }

    /// Wrap an optional record.
    pub fn from_option(
        record: Option<Box<dyn CredentialRecord>>,
        storage_attr: impl Into<String>,
    ) -> OAuth2Result<Self> {
        match record {
            Some(record) => Self::new(record, storage_attr),
            None => Ok(Self::empty(storage_attr)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_none()
    }

    pub fn storage_attr(&self) -> &str {
        &self.storage_attr
    }

    pub fn record(&self) -> Option<&dyn CredentialRecord> {
        self.record.as_deref()
    }

    pub fn into_record(self) -> Option<Box<dyn CredentialRecord>> {
        self.record
    }

    /// Current token bag.
    pub fn storage(&self) -> Option<TokenBag> {
        self.record
            .as_ref()
            .and_then(|record| record.storage(&self.storage_attr))
    }

    /// Replace the token bag.
    pub fn set_storage(&mut self, bag: TokenBag) {
        if let Some(record) = self.record.as_mut() {
            record.set_storage(&self.storage_attr, bag);
        }
    }

    /// Persist the record.
    pub async fn persist(&mut self) -> OAuth2Result<()> {
        match self.record.as_mut() {
            Some(record) => record.persist().await,
            None => Ok(()),
        }
    }
}
