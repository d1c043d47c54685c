//! OAuth2 Authorization Code Middleware
//!
//! Request-interception layer implementing the OAuth2 authorization code flow
//! in front of an application. For each configured provider it serves two
//! paths and passes everything else through:
//!
//! - `GET /<prefix>/<name>/auth` redirects to the provider's authorization endpoint
//! - `GET /<prefix>/<name>/auth_callback` exchanges the code for tokens and stores them
//!
//! After the application handled a request, token state of any client it
//! hydrated through the [`Factory`] is saved back to the user's credential record.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oauth2_middleware::{Builder, InMemoryCredentialStore, ProviderOptions, ProviderType};
//!
//! let store = Arc::new(InMemoryCredentialStore::new());
//!
//! let chain = Builder::new(Arc::new(MyApp))
//!     .with_defaults(
//!         ProviderOptions::from_env("GOOGLE").credential_store(store),
//!     )
//!     .provider(
//!         ProviderOptions::new()
//!             .provider_type(ProviderType::Login)
//!             .scope(vec!["openid", "email"]),
//!     )?
//!     .build();
//!
//! // For each incoming request:
//! let response = chain.call(&mut request).await?;
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, authorization options, tokens, request and response
//! - `error`: error hierarchy
//! - `core`: HTTP transport and identity token decoding
//! - `flows`: authorization code and refresh grants against the token endpoint
//! - `client`: per-provider client holding the token state of one request
//! - `persistence`: credential records, the store port and extraction strategies
//! - `middleware`: request context, handler, factory
//! - `builders`: provider options and the chain builder

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod middleware;
pub mod persistence;
pub mod types;

// Re-export builders
pub use builders::{Builder, ProviderOptions};

// Re-export client
pub use client::OAuth2Client;

// Re-export errors
pub use error::{
    create_error_from_response, map_authorization_error, map_token_error, parse_error_response,
    AuthorizationError, ConfigurationError, NetworkError, OAuth2Error, OAuth2ErrorResponse,
    OAuth2Result, ProtocolError, ProviderError, RequestError, StorageError,
};

// Re-export types
pub use types::{
    // Config
    ClientAuthMethod, ClientCredentials, ProviderConfig, ProviderType, TokenAttribute,
    DEFAULT_PERSIST_ATTRS,
    // Auth
    AuthOptions, Prompt, Scope,
    // Callback
    CallbackParams,
    // Token
    IdTokenClaims, TokenBag, TokenResponse,
    // Request
    Request, Response, Session,
};

// Re-export core components
pub use core::{
    decode_id_token, HttpRequest, HttpResponse, HttpTransport, IdTokenVerification,
    MockHttpTransport, ReqwestHttpTransport,
};

// Re-export flows
pub use flows::{AuthorizationCodeFlow, CodeExchangeRequest};

// Re-export persistence
pub use persistence::{
    ContextCredentials, CredentialRecord, CredentialStore, CredentialWrapper,
    DefaultCredentialExtractor, InMemoryCredentialRecord, InMemoryCredentialStore,
    SubjectCredentials, UserRecord,
};

// Re-export middleware
pub use middleware::{
    CachedInstance, Endpoint, Factory, OAuth2Handler, Provider, RequestContext, Route,
};
