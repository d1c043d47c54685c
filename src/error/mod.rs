//! OAuth2 Middleware Error Types
//!
//! Layered error hierarchy for construction-time and request-time failures.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the middleware.
#[derive(Error, Debug)]
pub enum OAuth2Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl OAuth2Error {
    /// Stable error code, recorded on failed requests.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH2_CONFIG",
            Self::Request(_) => "OAUTH2_REQUEST",
            Self::Authorization(_) => "OAUTH2_AUTH",
            Self::Storage(_) => "OAUTH2_STORAGE",
            Self::Network(_) => "OAUTH2_NETWORK",
            Self::Protocol(_) => "OAUTH2_PROTOCOL",
            Self::Provider(_) => "OAUTH2_PROVIDER",
        }
    }

    /// Whether the error came out of the token endpoint exchange.
    ///
    /// These are surfaced to the caller untouched; nothing in this crate retries them.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Protocol(_) | Self::Provider(_)
        )
    }
}

/// Configuration error. Raised while building the middleware chain.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("client id required for a login provider")]
    ClientIdRequired,

    #[error("scope required")]
    ScopeRequired,

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Request-time error raised by the handler or factory.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("no handler installed for provider {provider}")]
    HandlerNotFound { provider: String },

    #[error("Missing authorization code in auth_callback")]
    MissingCode,

    #[error("no signed-in user found in session")]
    NoSessionUser,

    #[error("cannot derive a redirect URI: request has no host")]
    MissingHost,

    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Authorization error reported by the provider on the callback redirect.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("Access denied by user")]
    AccessDenied {
        error_description: Option<String>,
        error_uri: Option<String>,
    },

    #[error("Invalid scope: {scope}")]
    InvalidScope {
        scope: String,
        error_uri: Option<String>,
    },

    #[error("Unauthorized client")]
    UnauthorizedClient { error_description: Option<String> },

    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        error_uri: Option<String>,
    },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable,
}

/// Persistence error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Persistence object does not support the storage attribute {storage_attr}")]
    UnsupportedStorageAttr { storage_attr: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid identity token: {message}")]
    InvalidIdToken { message: String },
}

/// Provider (token endpoint) error.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid scope: {scope}")]
    InvalidScope { scope: String },

    #[error("Unauthorized client for this grant type")]
    UnauthorizedClient { error_description: Option<String> },

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable,
}

/// Result type for middleware operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// OAuth2 error response body, from the token endpoint or the callback query.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Map an authorization error response (callback `error=`) to an error type.
pub fn map_authorization_error(response: &OAuth2ErrorResponse) -> AuthorizationError {
    match response.error.as_str() {
        "access_denied" => AuthorizationError::AccessDenied {
            error_description: response.error_description.clone(),
            error_uri: response.error_uri.clone(),
        },
        "invalid_scope" => AuthorizationError::InvalidScope {
            scope: response.error_description.clone().unwrap_or_default(),
            error_uri: response.error_uri.clone(),
        },
        "unauthorized_client" => AuthorizationError::UnauthorizedClient {
            error_description: response.error_description.clone(),
        },
        "server_error" => AuthorizationError::ServerError {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| "Server error".to_string()),
        },
        "temporarily_unavailable" => AuthorizationError::TemporarilyUnavailable,
        _ => AuthorizationError::InvalidRequest {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| response.error.clone()),
            error_uri: response.error_uri.clone(),
        },
    }
}

/// Map a token endpoint error response to an error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> ProviderError {
    match response.error.as_str() {
        "invalid_client" => ProviderError::InvalidClient {
            error_description: response.error_description.clone(),
        },
        "invalid_grant" => ProviderError::InvalidGrant {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| "Invalid grant".to_string()),
        },
        "invalid_scope" => ProviderError::InvalidScope {
            scope: response.error_description.clone().unwrap_or_default(),
        },
        "unauthorized_client" => ProviderError::UnauthorizedClient {
            error_description: response.error_description.clone(),
        },
        "unsupported_grant_type" => ProviderError::UnsupportedGrantType {
            grant_type: response.error_description.clone().unwrap_or_default(),
        },
        "server_error" => ProviderError::ServerError {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| "Server error".to_string()),
        },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable,
        _ => ProviderError::InvalidRequest {
            message: response
                .error_description
                .clone()
                .unwrap_or_else(|| response.error.clone()),
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success token endpoint response.
pub fn create_error_from_response(status: u16, body: &str) -> OAuth2Error {
    if let Some(response) = parse_error_response(body) {
        return OAuth2Error::Provider(map_token_error(&response));
    }

    let error = match status {
        400 => ProviderError::InvalidRequest {
            message: "Bad request".to_string(),
        },
        401 => ProviderError::InvalidClient {
            error_description: Some("Unauthorized".to_string()),
        },
        403 => ProviderError::UnauthorizedClient {
            error_description: Some("Forbidden".to_string()),
        },
        _ => ProviderError::ServerError {
            message: format!("HTTP {}", status),
        },
    };

    OAuth2Error::Provider(error)
}
