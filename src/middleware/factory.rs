//! Client Factory
//!
//! Hands out the client for a named provider, at most one hydrated and one
//! bare instance per provider and request.

use tracing::debug;

use crate::client::OAuth2Client;
use crate::error::{OAuth2Result, RequestError};
use crate::middleware::{CachedInstance, RequestContext};

pub struct Factory;

impl Factory {
    /// Client for the named provider.
    ///
    /// A hydrated instance cached earlier in the request is returned for either
    /// flag. With `hydrate` a new client is loaded from the signed-in user's
    /// record and cached so its token state is saved after the application
    /// runs. Without it the client carries no token state and is never saved.
    pub async fn get(
        name: &str,
        context: &mut RequestContext,
        hydrate: bool,
    ) -> OAuth2Result<OAuth2Client> {
        if let Some(instance) = context.instance(name) {
            return Ok(instance.client.clone());
        }
        if !hydrate {
            if let Some(client) = context.bare_client(name) {
                return Ok(client.clone());
            }
        }

        let provider = context
            .provider(name)
            .ok_or_else(|| RequestError::HandlerNotFound {
                provider: name.to_string(),
            })?;

        let client = provider.new_client();

        if !hydrate {
            context.cache_bare_client(name, client.clone());
            return Ok(client);
        }

        let credentials = provider.extract_by_context(context, &client).await?;
        provider.load_token_state(&credentials, &client);
        debug!(provider = name, hydrated = !credentials.is_empty(), "client instance cached");

        context.cache_instance(
            name,
            CachedInstance {
                credentials,
                client: client.clone(),
            },
        );
        Ok(client)
    }
}
