//! Middleware
//!
//! The request chain. Each [`OAuth2Handler`] serves one provider and holds
//! the next [`Endpoint`], ending in the application.

use async_trait::async_trait;

use crate::error::OAuth2Result;
use crate::types::{Request, Response};

pub mod context;
pub mod factory;
pub mod handler;
pub mod provider;

pub use context::{CachedInstance, RequestContext};
pub use factory::Factory;
pub use handler::OAuth2Handler;
pub use provider::{Provider, Route};

/// A link in the request chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: &mut Request) -> OAuth2Result<Response>;
}
