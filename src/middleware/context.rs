//! Request Context
//!
//! Per-request state shared by the handlers, the factory and the application.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::OAuth2Client;
use crate::middleware::Provider;
use crate::persistence::CredentialWrapper;
use crate::types::Session;

/// A hydrated client cached for the rest of the request, with the record it
/// was loaded from. Its token state is saved back after the application ran.
#[derive(Debug)]
pub struct CachedInstance {
    pub credentials: CredentialWrapper,
    pub client: OAuth2Client,
}

/// Per-request attributes, keyed by provider name.
#[derive(Debug, Default)]
pub struct RequestContext {
    session: Option<Session>,
    providers: HashMap<String, Arc<Provider>>,
    instances: HashMap<String, CachedInstance>,
    bare_clients: HashMap<String, OAuth2Client>,
    persisted: HashMap<String, CredentialWrapper>,
    auth_clients: HashMap<String, OAuth2Client>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Make a provider's handler reachable for the rest of the request.
    pub fn register_provider(&mut self, provider: Arc<Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn provider(&self, name: &str) -> Option<Arc<Provider>> {
        self.providers.get(name).cloned()
    }

    pub fn instance(&self, name: &str) -> Option<&CachedInstance> {
        self.instances.get(name)
    }

    pub fn instance_mut(&mut self, name: &str) -> Option<&mut CachedInstance> {
        self.instances.get_mut(name)
    }

    pub fn cache_instance(&mut self, name: impl Into<String>, instance: CachedInstance) {
        self.instances.insert(name.into(), instance);
    }

    pub(crate) fn bare_client(&self, name: &str) -> Option<&OAuth2Client> {
        self.bare_clients.get(name)
    }

    pub(crate) fn cache_bare_client(&mut self, name: impl Into<String>, client: OAuth2Client) {
        self.bare_clients.insert(name.into(), client);
    }

    /// The record the callback stored tokens in.
    pub fn persisted_credentials(&self, name: &str) -> Option<&CredentialWrapper> {
        self.persisted.get(name)
    }

    pub fn set_persisted(&mut self, name: impl Into<String>, credentials: CredentialWrapper) {
        self.persisted.insert(name.into(), credentials);
    }

    /// The authenticated client, when the callback was left to the application.
    pub fn auth_client(&self, name: &str) -> Option<&OAuth2Client> {
        self.auth_clients.get(name)
    }

    pub fn set_auth_client(&mut self, name: impl Into<String>, client: OAuth2Client) {
        self.auth_clients.insert(name.into(), client);
    }
}
