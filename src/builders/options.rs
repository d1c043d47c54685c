//! Provider Options
//!
//! Caller-facing provider options. Every field is optional; unset fields fall
//! back to the builder's defaults and then to the built-in defaults.

use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{HttpTransport, IdTokenVerification};
use crate::persistence::{ContextCredentials, CredentialStore, SubjectCredentials};
use crate::types::{ClientAuthMethod, Prompt, ProviderType, Scope, TokenAttribute};

/// Options for one provider.
///
/// Deserializable from configuration files; the strategy fields (extractors,
/// store, connection, identity token key) can only be set in code.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderOptions {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub provider_type: Option<ProviderType>,
    pub path_prefix: Option<String>,
    pub storage_attr: Option<String>,
    pub persist_attrs: Option<Vec<TokenAttribute>>,
    pub authorization_uri: Option<String>,
    pub token_credential_uri: Option<String>,
    pub approval_prompt: Option<String>,
    pub access_type: Option<String>,
    pub prompt: Option<Prompt>,
    pub scope: Option<Scope>,
    pub state: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub auth_method: Option<ClientAuthMethod>,
    pub redirect_uri: Option<String>,
    pub handle_auth_callback: Option<bool>,
    /// Token endpoint timeout, read from `timeout_ms` in configuration files.
    #[serde(rename = "timeout_ms", deserialize_with = "deserialize_millis")]
    pub timeout: Option<Duration>,
    #[serde(skip)]
    pub id_token_verification: Option<IdTokenVerification>,
    #[serde(skip)]
    pub extract_by_context: Option<Arc<dyn ContextCredentials>>,
    #[serde(skip)]
    pub extract_by_subject: Option<Arc<dyn SubjectCredentials>>,
    #[serde(skip)]
    pub credential_store: Option<Arc<dyn CredentialStore>>,
    #[serde(skip)]
    pub connection: Option<Arc<dyn HttpTransport>>,
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read client settings from `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET`,
    /// `<PREFIX>_REDIRECT_URI` and `<PREFIX>_SCOPE`. Unset or empty variables
    /// leave the option unset.
    pub fn from_env(prefix: &str) -> Self {
        let var = |suffix: &str| {
            std::env::var(format!("{}_{}", prefix, suffix))
                .ok()
                .filter(|v| !v.trim().is_empty())
        };

        Self {
            client_id: var("CLIENT_ID"),
            client_secret: var("CLIENT_SECRET").map(SecretString::new),
            redirect_uri: var("REDIRECT_URI"),
            scope: var("SCOPE").map(Scope::from),
            ..Self::default()
        }
    }

    /// Overlay `overrides` on these options, field by field.
    pub fn merge(self, overrides: ProviderOptions) -> ProviderOptions {
        ProviderOptions {
            name: overrides.name.or(self.name),
            provider_type: overrides.provider_type.or(self.provider_type),
            path_prefix: overrides.path_prefix.or(self.path_prefix),
            storage_attr: overrides.storage_attr.or(self.storage_attr),
            persist_attrs: overrides.persist_attrs.or(self.persist_attrs),
            authorization_uri: overrides.authorization_uri.or(self.authorization_uri),
            token_credential_uri: overrides.token_credential_uri.or(self.token_credential_uri),
            approval_prompt: overrides.approval_prompt.or(self.approval_prompt),
            access_type: overrides.access_type.or(self.access_type),
            prompt: overrides.prompt.or(self.prompt),
            scope: overrides.scope.or(self.scope),
            state: overrides.state.or(self.state),
            client_id: overrides.client_id.or(self.client_id),
            client_secret: overrides.client_secret.or(self.client_secret),
            auth_method: overrides.auth_method.or(self.auth_method),
            redirect_uri: overrides.redirect_uri.or(self.redirect_uri),
            handle_auth_callback: overrides.handle_auth_callback.or(self.handle_auth_callback),
            timeout: overrides.timeout.or(self.timeout),
            id_token_verification: overrides
                .id_token_verification
                .or(self.id_token_verification),
            extract_by_context: overrides.extract_by_context.or(self.extract_by_context),
            extract_by_subject: overrides.extract_by_subject.or(self.extract_by_subject),
            credential_store: overrides.credential_store.or(self.credential_store),
            connection: overrides.connection.or(self.connection),
        }
    }

    /// Set provider name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set provider type.
    pub fn provider_type(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = Some(provider_type);
        self
    }

    /// Set the first path segment of the intercepted paths.
    pub fn path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(path_prefix.into());
        self
    }

    /// Set the token bag field name on credential records.
    pub fn storage_attr(mut self, storage_attr: impl Into<String>) -> Self {
        self.storage_attr = Some(storage_attr.into());
        self
    }

    /// Set the persisted token attributes.
    pub fn persist_attrs(mut self, attrs: Vec<TokenAttribute>) -> Self {
        self.persist_attrs = Some(attrs);
        self
    }

    /// Set authorization endpoint.
    pub fn authorization_uri(mut self, uri: impl Into<String>) -> Self {
        self.authorization_uri = Some(uri.into());
        self
    }

    /// Set token endpoint.
    pub fn token_credential_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_credential_uri = Some(uri.into());
        self
    }

    pub fn approval_prompt(mut self, approval_prompt: impl Into<String>) -> Self {
        self.approval_prompt = Some(approval_prompt.into());
        self
    }

    pub fn access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = Some(access_type.into());
        self
    }

    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Set requested scope, a string or a list of strings.
    pub fn scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set a static `state` value for the authorization redirect.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Set a static redirect URI.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Persist tokens on callback, or leave the authenticated client to the application.
    pub fn handle_auth_callback(mut self, handle: bool) -> Self {
        self.handle_auth_callback = Some(handle);
        self
    }

    /// Set token endpoint timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Verify identity token signatures with this key.
    pub fn id_token_verification(mut self, verification: IdTokenVerification) -> Self {
        self.id_token_verification = Some(verification);
        self
    }

    pub fn extract_by_context(mut self, extractor: Arc<dyn ContextCredentials>) -> Self {
        self.extract_by_context = Some(extractor);
        self
    }

    pub fn extract_by_subject(mut self, extractor: Arc<dyn SubjectCredentials>) -> Self {
        self.extract_by_subject = Some(extractor);
        self
    }

    /// Store backing the default extractors.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Transport for token endpoint calls.
    pub fn connection(mut self, connection: Arc<dyn HttpTransport>) -> Self {
        self.connection = Some(connection);
        self
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(|ms| Some(Duration::from_millis(ms)))
}

impl std::fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("credential_store", &self.credential_store.is_some())
            .field("connection", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}
