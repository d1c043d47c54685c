//! Core Components
//!
//! Outbound transport and identity token decoding.

pub mod id_token;
pub mod transport;

pub use id_token::*;
pub use transport::*;
