//! Middleware Builder
//!
//! Resolves provider options into configurations and wraps the application in
//! one handler per provider.

use std::sync::Arc;
use tracing::info;

use crate::builders::ProviderOptions;
use crate::error::{ConfigurationError, OAuth2Result};
use crate::middleware::{Endpoint, OAuth2Handler, Provider};
use crate::persistence::{
    ContextCredentials, CredentialStore, DefaultCredentialExtractor, SubjectCredentials,
};
use crate::types::{
    ClientCredentials, ProviderConfig, ProviderType, TokenAttribute, DEFAULT_ACCESS_TYPE,
    DEFAULT_APPROVAL_PROMPT, DEFAULT_AUTHORIZATION_URI, DEFAULT_PATH_PREFIX,
    DEFAULT_PERSIST_ATTRS, DEFAULT_PROVIDER_NAME, DEFAULT_STORAGE_ATTR, DEFAULT_TIMEOUT,
    DEFAULT_TOKEN_CREDENTIAL_URI,
};

/// Builds the handler chain around an application.
pub struct Builder {
    app: Arc<dyn Endpoint>,
    defaults: ProviderOptions,
    providers: Vec<Arc<Provider>>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("defaults", &self.defaults)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Start a chain ending in `app`.
    pub fn new(app: Arc<dyn Endpoint>) -> Self {
        Self {
            app,
            defaults: ProviderOptions::default(),
            providers: Vec::new(),
        }
    }

    /// Options applied to every provider registered afterwards, below its own.
    pub fn with_defaults(mut self, defaults: ProviderOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Register a provider. Names must be unique within one chain.
    pub fn provider(mut self, options: ProviderOptions) -> OAuth2Result<Self> {
        let config = self.resolve(options)?;
        if self.providers.iter().any(|p| p.name() == config.name) {
            return Err(ConfigurationError::InvalidConfig {
                message: format!("provider {:?} is already registered", config.name),
            }
            .into());
        }
        info!(
            provider = %config.name,
            provider_type = config.provider_type.as_str(),
            "registering oauth2 provider"
        );
        self.providers.push(Arc::new(Provider::new(config)?));
        Ok(self)
    }

    pub fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    /// Merge built-in defaults, the builder's defaults and `options`, then validate.
    pub fn resolve(&self, options: ProviderOptions) -> OAuth2Result<ProviderConfig> {
        let options = self.defaults.clone().merge(options);

        let name = options
            .name
            .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string());
        let provider_type = options.provider_type.unwrap_or_default();
        let client_id = options.client_id.unwrap_or_default();

        if provider_type == ProviderType::Login {
            if client_id.is_empty() {
                return Err(ConfigurationError::ClientIdRequired.into());
            }
            if options.scope.as_ref().map_or(true, |s| s.is_empty()) {
                return Err(ConfigurationError::ScopeRequired.into());
            }
        }

        validate_segment("name", &name)?;
        let path_prefix = options
            .path_prefix
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PATH_PREFIX.to_string());
        validate_segment("path_prefix", &path_prefix)?;

        let authorization_uri = options
            .authorization_uri
            .unwrap_or_else(|| DEFAULT_AUTHORIZATION_URI.to_string());
        validate_url(&authorization_uri)?;
        let token_credential_uri = options
            .token_credential_uri
            .unwrap_or_else(|| DEFAULT_TOKEN_CREDENTIAL_URI.to_string());
        validate_url(&token_credential_uri)?;

        let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        let (extract_by_context, extract_by_subject) = resolve_extractors(
            options.extract_by_context,
            options.extract_by_subject,
            options.credential_store,
            &name,
            provider_type,
        )?;

        Ok(ProviderConfig {
            provider_type,
            path_prefix,
            storage_attr: options
                .storage_attr
                .unwrap_or_else(|| DEFAULT_STORAGE_ATTR.to_string()),
            persist_attrs: dedupe(
                options
                    .persist_attrs
                    .unwrap_or_else(|| DEFAULT_PERSIST_ATTRS.to_vec()),
            ),
            authorization_uri,
            token_credential_uri,
            approval_prompt: options
                .approval_prompt
                .unwrap_or_else(|| DEFAULT_APPROVAL_PROMPT.to_string()),
            access_type: Some(
                options
                    .access_type
                    .unwrap_or_else(|| DEFAULT_ACCESS_TYPE.to_string()),
            ),
            prompt: options.prompt,
            scope: options.scope,
            state: options.state,
            credentials: ClientCredentials {
                client_id,
                client_secret: options.client_secret,
                auth_method: options.auth_method.unwrap_or_default(),
            },
            redirect_uri: options.redirect_uri.filter(|uri| !uri.is_empty()),
            handle_auth_callback: options.handle_auth_callback.unwrap_or(true),
            timeout,
            id_token_verification: options.id_token_verification,
            extract_by_context,
            extract_by_subject,
            connection: options.connection,
            name,
        })
    }

    /// The chain entry point. The last registered provider is outermost.
    pub fn build(self) -> Arc<dyn Endpoint> {
        self.providers
            .into_iter()
            .fold(self.app, |next, provider| {
                Arc::new(OAuth2Handler::new(provider, next)) as Arc<dyn Endpoint>
            })
    }
}

fn validate_segment(field: &str, value: &str) -> OAuth2Result<()> {
    if value.is_empty() || value.contains('/') {
        return Err(ConfigurationError::InvalidConfig {
            message: format!("{} must be a single non-empty path segment, got {:?}", field, value),
        }
        .into());
    }
    Ok(())
}

fn validate_url(value: &str) -> OAuth2Result<()> {
    url::Url::parse(value).map_err(|_| ConfigurationError::InvalidEndpoint {
        url: value.to_string(),
    })?;
    Ok(())
}

fn dedupe(attrs: Vec<TokenAttribute>) -> Vec<TokenAttribute> {
    let mut unique = Vec::with_capacity(attrs.len());
    for attr in attrs {
        if !unique.contains(&attr) {
            unique.push(attr);
        }
    }
    unique
}

fn resolve_extractors(
    by_context: Option<Arc<dyn ContextCredentials>>,
    by_subject: Option<Arc<dyn SubjectCredentials>>,
    store: Option<Arc<dyn CredentialStore>>,
    name: &str,
    provider_type: ProviderType,
) -> OAuth2Result<(Arc<dyn ContextCredentials>, Arc<dyn SubjectCredentials>)> {
    if let (Some(by_context), Some(by_subject)) = (&by_context, &by_subject) {
        return Ok((by_context.clone(), by_subject.clone()));
    }

    let store = store.ok_or_else(|| ConfigurationError::MissingRequired {
        field: "credential_store".to_string(),
    })?;
    let default = Arc::new(DefaultCredentialExtractor::new(store, name, provider_type));

    Ok((
        by_context.unwrap_or_else(|| default.clone()),
        by_subject.unwrap_or(default),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OAuth2Error;
    use crate::persistence::InMemoryCredentialStore;
    use crate::types::{Request, Response, Scope};
    use async_trait::async_trait;
    use std::time::Duration;

    struct App;

    #[async_trait]
    impl Endpoint for App {
        async fn call(&self, _request: &mut Request) -> OAuth2Result<Response> {
            Ok(Response::ok("Root"))
        }
    }

    fn builder() -> Builder {
        Builder::new(Arc::new(App)).with_defaults(
            ProviderOptions::new().credential_store(Arc::new(InMemoryCredentialStore::new())),
        )
    }

    #[test]
    fn test_built_in_defaults() {
        let config = builder().resolve(ProviderOptions::new()).unwrap();
        assert_eq!(config.name, "google");
        assert_eq!(config.provider_type, ProviderType::Webserver);
        assert_eq!(config.storage_attr, "tokens");
        assert_eq!(config.persist_attrs, DEFAULT_PERSIST_ATTRS.to_vec());
        assert_eq!(config.approval_prompt, "auto");
        assert_eq!(config.access_type.as_deref(), Some("offline"));
        assert_eq!(config.authorization_uri, DEFAULT_AUTHORIZATION_URI);
        assert_eq!(config.token_credential_uri, DEFAULT_TOKEN_CREDENTIAL_URI);
        assert!(config.handle_auth_callback);
        assert!(config.redirect_uri.is_none());
        assert_eq!(config.auth_path(), "/oauth2/google/auth");
        assert_eq!(config.callback_path(), "/oauth2/google/auth_callback");
    }

    #[test]
    fn test_login_requires_client_id_before_scope() {
        let err = builder()
            .resolve(ProviderOptions::new().provider_type(ProviderType::Login))
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::ClientIdRequired)
        ));

        let err = builder()
            .resolve(
                ProviderOptions::new()
                    .provider_type(ProviderType::Login)
                    .client_id(""),
            )
            .unwrap_err();
        assert!(err.to_string().contains("client id required"));
    }

    #[test]
    fn test_login_requires_scope() {
        let login = || {
            ProviderOptions::new()
                .provider_type(ProviderType::Login)
                .client_id("id")
        };

        let err = builder().resolve(login()).unwrap_err();
        assert!(matches!(err, OAuth2Error::Configuration(ConfigurationError::ScopeRequired)));

        let err = builder()
            .resolve(login().scope(Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, OAuth2Error::Configuration(ConfigurationError::ScopeRequired)));

        assert!(builder().resolve(login().scope("test")).is_ok());
    }

    #[test]
    fn test_webserver_needs_no_scope() {
        assert!(builder().resolve(ProviderOptions::new()).is_ok());
    }

    #[test]
    fn test_later_options_win() {
        let builder = builder().with_defaults(
            ProviderOptions::new()
                .credential_store(Arc::new(InMemoryCredentialStore::new()))
                .client_id("default-id")
                .approval_prompt("force")
                .scope("default"),
        );
        let config = builder
            .resolve(ProviderOptions::new().client_id("id"))
            .unwrap();
        assert_eq!(config.credentials.client_id, "id");
        assert_eq!(config.approval_prompt, "force");
        assert_eq!(config.scope, Some(Scope::from("default")));
    }

    #[test]
    fn test_persist_attrs_are_deduplicated() {
        let config = builder()
            .resolve(ProviderOptions::new().persist_attrs(vec![
                TokenAttribute::AccessToken,
                TokenAttribute::RefreshToken,
                TokenAttribute::AccessToken,
            ]))
            .unwrap();
        assert_eq!(
            config.persist_attrs,
            vec![TokenAttribute::AccessToken, TokenAttribute::RefreshToken]
        );
    }

    #[test]
    fn test_invalid_values() {
        let err = builder()
            .resolve(ProviderOptions::new().token_credential_uri("/o/oauth2/token"))
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::InvalidEndpoint { .. })
        ));

        let err = builder()
            .resolve(ProviderOptions::new().name("a/b"))
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::InvalidConfig { .. })
        ));

        let config = builder()
            .resolve(ProviderOptions::new().path_prefix("/signet/"))
            .unwrap();
        assert_eq!(config.auth_path(), "/signet/google/auth");
    }

    #[test]
    fn test_timeout_resolution() {
        let config = builder()
            .resolve(ProviderOptions::new().timeout(Duration::from_millis(500)))
            .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(500));

        let config = builder()
            .resolve(ProviderOptions::new().timeout(Duration::from_millis(2900)))
            .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2900));

        let config = builder().resolve(ProviderOptions::new()).unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let err = builder()
            .resolve(ProviderOptions::new().timeout(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_duplicate_provider_name() {
        let err = builder()
            .provider(ProviderOptions::new().name("google"))
            .unwrap()
            .provider(ProviderOptions::new().name("google").approval_prompt("force"))
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::InvalidConfig { ref message }) if message.contains("already registered")
        ));
    }

    #[test]
    fn test_missing_store() {
        let err = Builder::new(Arc::new(App))
            .resolve(ProviderOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            OAuth2Error::Configuration(ConfigurationError::MissingRequired { ref field }) if field == "credential_store"
        ));
    }

    #[test]
    fn test_registers_providers_in_order() {
        let builder = builder()
            .provider(ProviderOptions::new().name("google"))
            .unwrap()
            .provider(ProviderOptions::new().name("github"))
            .unwrap();
        let names: Vec<_> = builder.providers().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["google", "github"]);
    }
}
