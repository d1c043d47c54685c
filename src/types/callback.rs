//! Callback Types
//!
//! Query parameters of the provider's redirect back to the callback path.

use crate::error::{map_authorization_error, AuthorizationError, OAuth2ErrorResponse};

/// Callback parameters from the authorization redirect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code (if success).
    pub code: Option<String>,
    /// State parameter.
    pub state: Option<String>,
    /// Error code (if authorization failed).
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
    /// Error URI.
    pub error_uri: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from a raw query string.
    ///
    /// The first occurrence of a repeated key wins; empty values count as absent.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();

        let pairs: Vec<(String, String)> = query
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                "error_uri" => &mut params.error_uri,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        params
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The provider-reported error, if any.
    pub fn authorization_error(&self) -> Option<AuthorizationError> {
        let error = self.error.clone()?;
        Some(map_authorization_error(&OAuth2ErrorResponse {
            error,
            error_description: self.error_description.clone(),
            error_uri: self.error_uri.clone(),
        }))
    }
}
