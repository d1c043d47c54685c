//! OAuth2 Middleware Types
//!
//! Configuration, authorization, token and request types.

pub mod auth;
pub mod callback;
pub mod config;
pub mod request;
pub mod token;

pub use auth::*;
pub use callback::*;
pub use config::*;
pub use request::*;
pub use token::*;
