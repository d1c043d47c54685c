//! Configuration Types
//!
//! The merged, validated configuration of one provider.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{HttpTransport, IdTokenVerification};
use crate::persistence::{ContextCredentials, SubjectCredentials};
use crate::types::{AuthOptions, Prompt, Scope};

/// Default provider name.
pub const DEFAULT_PROVIDER_NAME: &str = "google";
/// Default first path segment of the intercepted paths.
pub const DEFAULT_PATH_PREFIX: &str = "oauth2";
/// Default name of the token bag field on a credential record.
pub const DEFAULT_STORAGE_ATTR: &str = "tokens";
pub const DEFAULT_APPROVAL_PROMPT: &str = "auto";
pub const DEFAULT_ACCESS_TYPE: &str = "offline";
pub const DEFAULT_AUTHORIZATION_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_CREDENTIAL_URI: &str = "https://accounts.google.com/o/oauth2/token";
/// Token endpoint timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Token attributes persisted when none are configured.
///
/// Matches the shape of Google's token endpoint response.
pub const DEFAULT_PERSIST_ATTRS: [TokenAttribute; 3] = [
    TokenAttribute::RefreshToken,
    TokenAttribute::AccessToken,
    TokenAttribute::ExpiresIn,
];

/// What the callback is used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// The provider signs users in: the subject of the identity token keys the user.
    Login,
    /// The provider grants API access to an already signed-in user.
    #[default]
    Webserver,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Webserver => "webserver",
        }
    }
}

/// A token field that can be copied between a client and a credential record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAttribute {
    AccessToken,
    RefreshToken,
    ExpiresIn,
    IssuedAt,
    IdToken,
    TokenType,
}

impl TokenAttribute {
    /// Key used for this attribute in the persisted bag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::ExpiresIn => "expires_in",
            Self::IssuedAt => "issued_at",
            Self::IdToken => "id_token",
            Self::TokenType => "token_type",
        }
    }
}

/// Client authentication method at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in request body.
    #[default]
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    ClientSecretBasic,
    /// No client authentication (public client).
    None,
}

/// Client credentials for the token endpoint.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
    /// Client authentication method.
    pub auth_method: ClientAuthMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// Merged configuration for one provider. Never mutated after the builder produces it.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider name, used in paths and context keys.
    pub name: String,
    pub provider_type: ProviderType,
    /// First path segment of the intercepted paths, without slashes.
    pub path_prefix: String,
    /// Name of the token bag field on credential records.
    pub storage_attr: String,
    /// Token attributes copied to and from credential records, in order, without duplicates.
    pub persist_attrs: Vec<TokenAttribute>,
    pub authorization_uri: String,
    pub token_credential_uri: String,
    pub approval_prompt: String,
    pub access_type: Option<String>,
    pub prompt: Option<Prompt>,
    pub scope: Option<Scope>,
    /// Static `state` value placed on the authorization redirect.
    pub state: Option<String>,
    pub credentials: ClientCredentials,
    /// Static redirect URI. When absent it is derived from each request.
    pub redirect_uri: Option<String>,
    /// Persist tokens on callback, or hand the authenticated client to the application.
    pub handle_auth_callback: bool,
    pub timeout: Duration,
    pub id_token_verification: Option<IdTokenVerification>,
    pub extract_by_context: Arc<dyn ContextCredentials>,
    pub extract_by_subject: Arc<dyn SubjectCredentials>,
    /// Transport override for token endpoint calls.
    pub connection: Option<Arc<dyn HttpTransport>>,
}

impl ProviderConfig {
    /// Path that starts the authorization redirect.
    pub fn auth_path(&self) -> String {
        format!("/{}/{}/auth", self.path_prefix, self.name)
    }

    /// Path the provider redirects back to.
    pub fn callback_path(&self) -> String {
        format!("/{}/{}/auth_callback", self.path_prefix, self.name)
    }

    /// Authorization URL options known at configuration time.
    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            prompt: self.prompt,
            redirect_uri: self.redirect_uri.clone().filter(|uri| !uri.is_empty()),
            approval_prompt: Some(self.approval_prompt.clone()),
            client_id: Some(self.credentials.client_id.clone()).filter(|id| !id.is_empty()),
            access_type: self.access_type.clone(),
            scope: self.scope.clone(),
            state: self.state.clone(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("path_prefix", &self.path_prefix)
            .field("storage_attr", &self.storage_attr)
            .field("persist_attrs", &self.persist_attrs)
            .field("authorization_uri", &self.authorization_uri)
            .field("token_credential_uri", &self.token_credential_uri)
            .field("approval_prompt", &self.approval_prompt)
            .field("scope", &self.scope)
            .field("credentials", &self.credentials)
            .field("redirect_uri", &self.redirect_uri)
            .field("handle_auth_callback", &self.handle_auth_callback)
            .field("connection", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}
