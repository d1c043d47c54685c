//! OAuth2 Handler
//!
//! Intercepts a provider's authorize and callback paths. Everything else goes
//! to the next endpoint, after which token state of a client hydrated during
//! the request is written back to its record.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{OAuth2Error, OAuth2Result, RequestError};
use crate::middleware::{Endpoint, Factory, Provider, Route};
use crate::types::{CallbackParams, Request, Response};

pub struct OAuth2Handler {
    provider: Arc<Provider>,
    next: Arc<dyn Endpoint>,
}

impl OAuth2Handler {
    pub fn new(provider: Arc<Provider>, next: Arc<dyn Endpoint>) -> Self {
        Self { provider, next }
    }

    pub fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    #[instrument(skip_all)]
    async fn authorize(&self, request: &mut Request) -> OAuth2Result<Response> {
        let client = Factory::get(self.provider.name(), &mut request.context, false).await?;
        let options = self.provider.auth_options(request)?;
        let location = client.authorization_uri(&options);
        debug!(redirect_uri = ?options.redirect_uri, "redirecting to authorization endpoint");
        Response::redirect(&location)
    }

    #[instrument(skip_all)]
    async fn callback(&self, request: &mut Request) -> OAuth2Result<()> {
        let name = self.provider.name();
        let client = Factory::get(name, &mut request.context, false).await?;

        let params = CallbackParams::from_query(request.query());
        if let Some(error) = params.authorization_error() {
            warn!(error = ?params.error, "provider reported an authorization error");
            return Err(error.into());
        }
        let code = params.code.ok_or(RequestError::MissingCode)?;

        let options = self.provider.auth_options(request)?;
        client.set_code(code);
        client.set_redirect_uri(options.redirect_uri.unwrap_or_default());

        client.fetch_access_token().await?;

        if self.provider.config().handle_auth_callback {
            let subject_id = client.subject_id()?;
            let mut credentials = self
                .provider
                .extract_by_subject(&request.context, &client, subject_id.as_deref())
                .await?;
            self.provider.save_token_state(&mut credentials, &client);
            credentials.persist().await?;
            info!("tokens persisted from callback");
            request.context.set_persisted(name, credentials);
        } else {
            debug!("exposing authenticated client to the application");
            request.context.set_auth_client(name, client);
        }
        Ok(())
    }

    async fn passthrough(&self, request: &mut Request) -> OAuth2Result<Response> {
        let response = self.next.call(request).await?;

        if let Some(instance) = request.context.instance_mut(self.provider.name()) {
            self.provider
                .save_token_state(&mut instance.credentials, &instance.client);
            instance.credentials.persist().await?;
            debug!(empty = instance.credentials.is_empty(), "token state saved after request");
        }

        Ok(response)
    }
}

#[async_trait]
impl Endpoint for OAuth2Handler {
    #[instrument(skip_all, fields(provider = %self.provider.name(), path = %request.path()))]
    async fn call(&self, request: &mut Request) -> OAuth2Result<Response> {
        request.context.register_provider(self.provider.clone());

        match self.provider.route(request) {
            Route::Authorize => self.authorize(request).await.inspect_err(log_failure),
            Route::Callback => {
                self.callback(request).await.inspect_err(log_failure)?;
                self.passthrough(request).await
            }
            Route::Passthrough => self.passthrough(request).await,
        }
    }
}

fn log_failure(err: &OAuth2Error) {
    warn!(code = err.error_code(), upstream = err.is_upstream(), error = %err, "oauth2 request failed");
}

impl std::fmt::Debug for OAuth2Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Handler")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}
