//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oauth2_middleware::{
    Builder, Endpoint, Factory, InMemoryCredentialStore, MockHttpTransport, OAuth2Client,
    OAuth2Result, ProviderOptions, ProviderType, Request, Response,
};

pub const HOST: &str = "http://myitcv.org.uk:4321";
pub const SUBJECT: &str = "105997489348527668257";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Downstream application. Optionally hydrates a provider's client through the
/// factory, and refreshes it.
#[derive(Default)]
pub struct FakeApp {
    calls: AtomicUsize,
    hydrate: Option<String>,
    refresh: bool,
    hydrated: Mutex<Option<OAuth2Client>>,
}

impl FakeApp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hydrating(name: &str, refresh: bool) -> Arc<Self> {
        Arc::new(Self {
            hydrate: Some(name.to_string()),
            refresh,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn hydrated(&self) -> Option<OAuth2Client> {
        self.hydrated.lock().clone()
    }
}

#[async_trait]
impl Endpoint for FakeApp {
    async fn call(&self, request: &mut Request) -> OAuth2Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(name) = &self.hydrate {
            let client = Factory::get(name, &mut request.context, true).await?;
            *self.hydrated.lock() = Some(client.clone());
            if self.refresh {
                client.refresh_access_token().await?;
            }
        }

        if request.path().ends_with("/auth_callback") {
            Ok(Response::ok("Auth Callback"))
        } else {
            Ok(Response::ok("Root"))
        }
    }
}

pub fn id_token(sub: &str) -> String {
    encode(
        &Header::default(),
        &json!({
            "iss": "accounts.google.com",
            "aud": "id",
            "cid": "id",
            "azp": "id",
            "sub": sub,
            "iat": 12,
            "exp": 42
        }),
        &EncodingKey::from_secret(b"secret"),
    )
    .unwrap()
}

pub fn token_response() -> serde_json::Value {
    json!({
        "access_token": "my_access_token",
        "token_type": "Bearer",
        "expires_in": 1234,
        "id_token": id_token(SUBJECT),
        "refresh_token": "my_refresh_token"
    })
}

/// Token endpoint answering one exchange with [`token_response`].
pub fn token_endpoint() -> Arc<MockHttpTransport> {
    let transport = Arc::new(MockHttpTransport::new());
    transport.queue_json_response(200, &token_response());
    transport
}

pub fn login_options() -> ProviderOptions {
    ProviderOptions::new()
        .provider_type(ProviderType::Login)
        .client_id("id")
}

/// Chain with a single provider in front of `app`.
pub fn chain(
    app: Arc<FakeApp>,
    store: &Arc<InMemoryCredentialStore>,
    options: ProviderOptions,
) -> Arc<dyn Endpoint> {
    Builder::new(app)
        .with_defaults(ProviderOptions::new().credential_store(store.clone()))
        .provider(options)
        .unwrap()
        .build()
}

pub fn get(path_and_query: &str) -> Request {
    Request::get(format!("{}{}", HOST, path_and_query).parse().unwrap())
}
