//! Persistence
//!
//! - `record`: the credential record capability and its wrapper
//! - `store`: user and credential lookup, with an in-memory backend
//! - `extract`: per-request strategies that locate a record

pub mod extract;
pub mod record;
pub mod store;

pub use extract::{ContextCredentials, DefaultCredentialExtractor, SubjectCredentials};
pub use record::{CredentialRecord, CredentialWrapper};
pub use store::{CredentialStore, InMemoryCredentialRecord, InMemoryCredentialStore, UserRecord};
