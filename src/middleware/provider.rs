//! Provider
//!
//! One configured provider: its merged configuration, its authorization code
//! flow, and the token state transfer between clients and credential records.

use http::Method;
use std::sync::Arc;
use tracing::debug;

use crate::client::OAuth2Client;
use crate::core::{HttpTransport, ReqwestHttpTransport, DEFAULT_MAX_RESPONSE_SIZE};
use crate::error::{OAuth2Result, RequestError};
use crate::flows::AuthorizationCodeFlow;
use crate::middleware::RequestContext;
use crate::persistence::CredentialWrapper;
use crate::types::{AuthOptions, ProviderConfig, Request, TokenBag};

/// Which branch of the handler a request takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Authorize,
    Callback,
    Passthrough,
}

pub struct Provider {
    config: ProviderConfig,
    flow: Arc<AuthorizationCodeFlow>,
}

impl Provider {
    /// Create a provider, with the reqwest transport unless a connection is configured.
    pub fn new(config: ProviderConfig) -> OAuth2Result<Self> {
        let transport: Arc<dyn HttpTransport> = match &config.connection {
            Some(connection) => connection.clone(),
            None => Arc::new(ReqwestHttpTransport::with_options(
                config.timeout,
                DEFAULT_MAX_RESPONSE_SIZE,
            )?),
        };

        let flow = AuthorizationCodeFlow::new(
            config.credentials.clone(),
            config.authorization_uri.clone(),
            config.token_credential_uri.clone(),
            config.timeout,
            transport,
        );

        Ok(Self {
            config,
            flow: Arc::new(flow),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn route(&self, request: &Request) -> Route {
        if request.method != Method::GET {
            return Route::Passthrough;
        }
        let path = request.path();
        if path == self.config.auth_path() {
            Route::Authorize
        } else if path == self.config.callback_path() {
            Route::Callback
        } else {
            Route::Passthrough
        }
    }

    /// Authorization options for this request.
    ///
    /// Without a configured redirect URI, it points at this provider's
    /// callback path on the host the request was addressed to.
    pub fn auth_options(&self, request: &Request) -> OAuth2Result<AuthOptions> {
        let options = self.config.auth_options();
        if options.redirect_uri.is_some() {
            return Ok(options);
        }

        let host = request.host_with_port().ok_or(RequestError::MissingHost)?;
        let redirect_uri = format!(
            "{}://{}{}",
            request.scheme(),
            host,
            self.config.callback_path()
        );
        Ok(options.redirect_uri(redirect_uri))
    }

    /// A client with no token state.
    pub fn new_client(&self) -> OAuth2Client {
        OAuth2Client::new(self.flow.clone(), self.config.id_token_verification.clone())
    }

    /// Copy the client's persisted attributes into the record's token bag.
    ///
    /// Attributes the client has no value for keep their stored value. The
    /// bag is written back whole rather than edited in place.
    pub fn save_token_state(&self, credentials: &mut CredentialWrapper, client: &OAuth2Client) {
        if credentials.is_empty() {
            return;
        }

        let mut bag: TokenBag = credentials.storage().unwrap_or_default();
        for attr in &self.config.persist_attrs {
            if let Some(value) = client.token_attribute(*attr) {
                bag.insert(attr.as_str().to_string(), value);
            }
        }
        credentials.set_storage(bag);
    }

    /// Assign the record's stored attributes onto the client.
    pub fn load_token_state(&self, credentials: &CredentialWrapper, client: &OAuth2Client) {
        let Some(bag) = credentials.storage() else {
            return;
        };
        for attr in &self.config.persist_attrs {
            if let Some(value) = bag.get(attr.as_str()) {
                client.set_token_attribute(*attr, value);
            }
        }
    }

    /// The signed-in user's record, or an empty wrapper.
    pub async fn extract_by_context(
        &self,
        context: &RequestContext,
        client: &OAuth2Client,
    ) -> OAuth2Result<CredentialWrapper> {
        let record = self
            .config
            .extract_by_context
            .extract_by_context(context, client)
            .await?;
        debug!(provider = %self.config.name, found = record.is_some(), "credentials extracted from context");
        CredentialWrapper::from_option(record, self.config.storage_attr.clone())
    }

    /// The record a completed exchange is stored in.
    pub async fn extract_by_subject(
        &self,
        context: &RequestContext,
        client: &OAuth2Client,
        subject_id: Option<&str>,
    ) -> OAuth2Result<CredentialWrapper> {
        let record = self
            .config
            .extract_by_subject
            .extract_by_subject(context, client, subject_id)
            .await?;
        CredentialWrapper::new(record, self.config.storage_attr.clone())
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
