//! OAuth2 Flows
//!
//! - **Authorization Code Flow** (RFC 6749 Section 4.1), with the Section 6
//!   refresh grant for renewing its tokens

pub mod authorization_code;

pub use authorization_code::{AuthorizationCodeFlow, CodeExchangeRequest};
