//! Builders
//!
//! Provider options and the builder that turns them into a handler chain.

pub mod builder;
pub mod options;

pub use builder::Builder;
pub use options::ProviderOptions;
