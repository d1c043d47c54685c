//! Credential Extraction
//!
//! Strategies that locate the credential record for a request. Both are
//! overridable per provider; [`DefaultCredentialExtractor`] implements them
//! over a [`CredentialStore`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::client::OAuth2Client;
use crate::error::{OAuth2Result, ProtocolError, RequestError};
use crate::middleware::RequestContext;
use crate::persistence::{CredentialRecord, CredentialStore, UserRecord};
use crate::types::ProviderType;

/// Finds the record for the signed-in user of a request, if any.
#[async_trait]
pub trait ContextCredentials: Send + Sync {
    async fn extract_by_context(
        &self,
        context: &RequestContext,
        client: &OAuth2Client,
    ) -> OAuth2Result<Option<Box<dyn CredentialRecord>>>;
}

/// Finds or creates the record to store a completed exchange in.
///
/// `subject_id` is the `sub` claim of the identity token, when one was returned.
#[async_trait]
pub trait SubjectCredentials: Send + Sync {
    async fn extract_by_subject(
        &self,
        context: &RequestContext,
        client: &OAuth2Client,
        subject_id: Option<&str>,
    ) -> OAuth2Result<Box<dyn CredentialRecord>>;
}

/// Default extraction over a credential store.
pub struct DefaultCredentialExtractor {
    store: Arc<dyn CredentialStore>,
    provider_name: String,
    provider_type: ProviderType,
}

impl DefaultCredentialExtractor {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider_name: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            store,
            provider_name: provider_name.into(),
            provider_type,
        }
    }

    async fn session_user(&self, context: &RequestContext) -> OAuth2Result<Option<UserRecord>> {
        match context.session().and_then(|s| s.user_id()) {
            Some(user_id) => self.store.find_user(user_id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ContextCredentials for DefaultCredentialExtractor {
    async fn extract_by_context(
        &self,
        context: &RequestContext,
        _client: &OAuth2Client,
    ) -> OAuth2Result<Option<Box<dyn CredentialRecord>>> {
        match self.session_user(context).await? {
            Some(user) => self.store.find_credentials(&user.id, &self.provider_name).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SubjectCredentials for DefaultCredentialExtractor {
    async fn extract_by_subject(
        &self,
        context: &RequestContext,
        _client: &OAuth2Client,
        subject_id: Option<&str>,
    ) -> OAuth2Result<Box<dyn CredentialRecord>> {
        let user = match self.provider_type {
            ProviderType::Login => {
                let subject_id = subject_id.ok_or_else(|| ProtocolError::MissingField {
                    field: "id_token".to_string(),
                })?;
                let uid = format!("{}_{}", self.provider_name, subject_id);
                self.store.find_or_create_user_by_uid(&uid).await?
            }
            ProviderType::Webserver => self
                .session_user(context)
                .await?
                .ok_or(RequestError::NoSessionUser)?,
        };

        debug!(provider = %self.provider_name, user_id = %user.id, "credential owner resolved");
        self.store
            .find_or_initialize_credentials(&user.id, &self.provider_name)
            .await
    }
}
