//! Configuration surface: defaults, file-based options and environment.

mod common;

use common::*;
use std::sync::Arc;

use oauth2_middleware::{
    Builder, ConfigurationError, Endpoint, InMemoryCredentialStore, OAuth2Error, ProviderOptions,
    ProviderType, Scope, TokenAttribute,
};

#[test]
fn test_login_provider_validation_order() {
    let store = Arc::new(InMemoryCredentialStore::new());
    let builder = Builder::new(FakeApp::new())
        .with_defaults(ProviderOptions::new().credential_store(store));

    let err = builder
        .resolve(ProviderOptions::new().provider_type(ProviderType::Login).scope("test"))
        .unwrap_err();
    assert!(matches!(err, OAuth2Error::Configuration(ConfigurationError::ClientIdRequired)));

    let err = builder
        .resolve(ProviderOptions::new().provider_type(ProviderType::Login))
        .unwrap_err();
    assert!(matches!(err, OAuth2Error::Configuration(ConfigurationError::ClientIdRequired)));

    let err = builder.resolve(login_options()).unwrap_err();
    assert!(matches!(err, OAuth2Error::Configuration(ConfigurationError::ScopeRequired)));
}

#[test]
fn test_defaults_satisfy_login_requirements() {
    let store = Arc::new(InMemoryCredentialStore::new());
    let builder = Builder::new(FakeApp::new()).with_defaults(
        ProviderOptions::new()
            .credential_store(store)
            .client_id("shared-id")
            .scope(vec!["openid", "email"]),
    );

    let config = builder
        .resolve(ProviderOptions::new().provider_type(ProviderType::Login))
        .unwrap();
    assert_eq!(config.credentials.client_id, "shared-id");
    assert_eq!(config.scope.unwrap().to_param(), "openid email");
}

#[test]
fn test_options_from_json() {
    let options: ProviderOptions = serde_json::from_str(
        r#"{
            "name": "google",
            "type": "login",
            "path_prefix": "signet",
            "storage_attr": "signet",
            "client_id": "id",
            "client_secret": "secret",
            "scope": " test ",
            "persist_attrs": ["refresh_token", "access_token", "expires_in", "issued_at"],
            "timeout_ms": 5000
        }"#,
    )
    .unwrap();

    let store = Arc::new(InMemoryCredentialStore::with_storage_attr("signet"));
    let config = Builder::new(FakeApp::new())
        .resolve(options.credential_store(store))
        .unwrap();

    assert_eq!(config.auth_path(), "/signet/google/auth");
    assert_eq!(config.storage_attr, "signet");
    assert_eq!(config.persist_attrs.last(), Some(&TokenAttribute::IssuedAt));
    assert_eq!(config.timeout, std::time::Duration::from_secs(5));
    assert_eq!(config.scope, Some(Scope::from(" test ")));
}

#[test]
fn test_options_from_env() {
    std::env::set_var("BUILDER_TEST_CLIENT_ID", "env-id");
    std::env::set_var("BUILDER_TEST_CLIENT_SECRET", "env-secret");
    std::env::set_var("BUILDER_TEST_SCOPE", "email");
    std::env::set_var("BUILDER_TEST_REDIRECT_URI", "https://app.example.com/oauth2/google/auth_callback");

    let store = Arc::new(InMemoryCredentialStore::new());
    let config = Builder::new(FakeApp::new())
        .with_defaults(ProviderOptions::from_env("BUILDER_TEST").credential_store(store))
        .resolve(ProviderOptions::new().provider_type(ProviderType::Login))
        .unwrap();

    assert_eq!(config.credentials.client_id, "env-id");
    assert!(config.credentials.client_secret.is_some());
    assert_eq!(
        config.redirect_uri.as_deref(),
        Some("https://app.example.com/oauth2/google/auth_callback")
    );
}

#[tokio::test]
async fn test_custom_path_prefix_end_to_end() {
    let store = Arc::new(InMemoryCredentialStore::new());
    let chain = chain(
        FakeApp::new(),
        &store,
        login_options().scope("test").path_prefix("signet"),
    );

    let response = chain.call(&mut get("/signet/google/auth")).await.unwrap();
    assert_eq!(
        response.location(),
        Some("https://accounts.google.com/o/oauth2/auth?access_type=offline&approval_prompt=auto&client_id=id&redirect_uri=http://myitcv.org.uk:4321/signet/google/auth_callback&response_type=code&scope=test")
    );

    let response = chain.call(&mut get("/oauth2/google/auth")).await.unwrap();
    assert_eq!(response.body, "Root");
}
