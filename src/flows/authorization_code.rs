//! Authorization Code Flow
//!
//! RFC 6749 Section 4.1 - Authorization Code Grant, plus the Section 6
//! refresh grant used to renew tokens obtained through it.

use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{create_error_from_response, OAuth2Result, ProtocolError};
use crate::types::{AuthOptions, ClientAuthMethod, ClientCredentials, TokenResponse};

/// Characters escaped in authorization URL query values.
///
/// `:` and `/` stay literal so redirect URIs and URL-shaped scopes remain readable.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'/')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b',');

/// Code exchange request.
#[derive(Clone, Debug)]
pub struct CodeExchangeRequest {
    /// Authorization code.
    pub code: String,
    /// Redirect URI (must match authorization request).
    pub redirect_uri: String,
}

/// Authorization Code Flow against one provider's endpoints.
pub struct AuthorizationCodeFlow {
    credentials: ClientCredentials,
    authorization_uri: String,
    token_credential_uri: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl AuthorizationCodeFlow {
    /// Create new Authorization Code Flow.
    pub fn new(
        credentials: ClientCredentials,
        authorization_uri: impl Into<String>,
        token_credential_uri: impl Into<String>,
        timeout: Duration,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            credentials,
            authorization_uri: authorization_uri.into(),
            token_credential_uri: token_credential_uri.into(),
            timeout,
            transport,
        }
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Build the authorization URL the user is redirected to.
    ///
    /// Parameters are emitted in name order. The flow's client id is used when
    /// the options carry none.
    pub fn build_authorization_url(&self, options: &AuthOptions) -> String {
        let mut params = options.query_params();
        if !params.contains_key("client_id") && !self.credentials.client_id.is_empty() {
            params.insert("client_id", self.credentials.client_id.clone());
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, utf8_percent_encode(v, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.authorization_uri.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{}{}", self.authorization_uri, separator, query)
    }

    /// Exchange authorization code for tokens.
    #[instrument(skip_all, fields(token_uri = %self.token_credential_uri))]
    pub async fn exchange_code(&self, request: &CodeExchangeRequest) -> OAuth2Result<TokenResponse> {
        debug!("exchanging authorization code");
        self.request_token(vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", request.code.clone()),
            ("redirect_uri", request.redirect_uri.clone()),
        ])
        .await
    }

    /// Exchange a refresh token for a new access token.
    #[instrument(skip_all, fields(token_uri = %self.token_credential_uri))]
    pub async fn refresh(&self, refresh_token: &str) -> OAuth2Result<TokenResponse> {
        debug!("refreshing access token");
        self.request_token(vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ])
        .await
    }

    async fn request_token(&self, params: Vec<(&str, String)>) -> OAuth2Result<TokenResponse> {
        let http_request = HttpRequest {
            url: self.token_credential_uri.clone(),
            headers: self.build_token_request_headers(),
            body: Some(self.build_token_request_body(params)?),
            timeout: Some(self.timeout),
        };

        let response = self.transport.send(http_request).await?;

        if !(200..300).contains(&response.status) {
            return Err(create_error_from_response(response.status, &response.body));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            ProtocolError::InvalidJson {
                message: e.to_string(),
            }
            .into()
        })
    }

    fn build_token_request_body(&self, mut params: Vec<(&str, String)>) -> OAuth2Result<String> {
        // Basic auth carries the client id in the header.
        if self.credentials.auth_method != ClientAuthMethod::ClientSecretBasic {
            params.push(("client_id", self.credentials.client_id.clone()));
        }

        if self.credentials.auth_method == ClientAuthMethod::ClientSecretPost {
            if let Some(secret) = &self.credentials.client_secret {
                use secrecy::ExposeSecret;
                params.push(("client_secret", secret.expose_secret().to_string()));
            }
        }

        serde_urlencoded::to_string(&params).map_err(|e| {
            ProtocolError::InvalidResponse {
                message: format!("could not encode token request: {}", e),
            }
            .into()
        })
    }

    fn build_token_request_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        if self.credentials.auth_method == ClientAuthMethod::ClientSecretBasic {
            if let Some(secret) = &self.credentials.client_secret {
                use secrecy::ExposeSecret;
                let credentials = format!(
                    "{}:{}",
                    self.credentials.client_id,
                    secret.expose_secret()
                );
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                headers.insert("authorization".to_string(), format!("Basic {}", encoded));
            }
        }

        headers
    }
}

impl std::fmt::Debug for AuthorizationCodeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCodeFlow")
            .field("credentials", &self.credentials)
            .field("authorization_uri", &self.authorization_uri)
            .field("token_credential_uri", &self.token_credential_uri)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use crate::error::{OAuth2Error, ProviderError};
    use crate::types::Scope;
    use secrecy::SecretString;

    fn flow(auth_method: ClientAuthMethod, transport: Arc<MockHttpTransport>) -> AuthorizationCodeFlow {
        AuthorizationCodeFlow::new(
            ClientCredentials {
                client_id: "id".to_string(),
                client_secret: Some(SecretString::new("s3cret".to_string())),
                auth_method,
            },
            "https://accounts.google.com/o/oauth2/auth",
            "https://accounts.google.com/o/oauth2/token",
            Duration::from_secs(5),
            transport,
        )
    }

    fn options(scope: Scope) -> AuthOptions {
        AuthOptions {
            approval_prompt: Some("auto".to_string()),
            access_type: Some("offline".to_string()),
            client_id: Some("id".to_string()),
            scope: Some(scope),
            ..Default::default()
        }
        .redirect_uri("http://myitcv.org.uk:4321/oauth2/google/auth_callback")
    }

    #[test]
    fn test_build_authorization_url() {
        let flow = flow(ClientAuthMethod::ClientSecretPost, Arc::new(MockHttpTransport::new()));
        let url = flow.build_authorization_url(&options(Scope::from(vec!["test", "trial"])));
        assert_eq!(
            url,
            "https://accounts.google.com/o/oauth2/auth?access_type=offline&approval_prompt=auto&client_id=id&redirect_uri=http://myitcv.org.uk:4321/oauth2/google/auth_callback&response_type=code&scope=test%20trial"
        );
    }

    #[test]
    fn test_url_scope_stays_literal() {
        let flow = flow(ClientAuthMethod::ClientSecretPost, Arc::new(MockHttpTransport::new()));
        let url = flow.build_authorization_url(&options(Scope::from(vec![
            "https://www.googleapis.com/auth/userinfo.email",
        ])));
        assert!(url.ends_with("&scope=https://www.googleapis.com/auth/userinfo.email"));
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let flow = flow(ClientAuthMethod::ClientSecretPost, Arc::new(MockHttpTransport::new()));
        let mut opts = options(Scope::from("a&b=c+d#e"));
        opts.state = Some("x y".to_string());
        let url = flow.build_authorization_url(&opts);
        assert!(url.contains("&scope=a%26b%3Dc%2Bd%23e&"));
        assert!(url.ends_with("&state=x%20y"));
    }

    #[test]
    fn test_client_id_falls_back_to_credentials() {
        let flow = flow(ClientAuthMethod::ClientSecretPost, Arc::new(MockHttpTransport::new()));
        let url = flow.build_authorization_url(&AuthOptions::default());
        assert_eq!(
            url,
            "https://accounts.google.com/o/oauth2/auth?client_id=id&response_type=code"
        );
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &serde_json::json!({"access_token": "at", "refresh_token": "rt", "expires_in": 3600}),
        );
        let flow = flow(ClientAuthMethod::ClientSecretPost, transport.clone());

        let response = flow
            .exchange_code(&CodeExchangeRequest {
                code: "4/abc".to_string(),
                redirect_uri: "http://localhost/cb".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.access_token, "at");

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.url, "https://accounts.google.com/o/oauth2/token");
        let body = request.body.unwrap();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=4%2Fabc"));
        assert!(body.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcb"));
        assert!(body.contains("client_secret=s3cret"));
        assert!(!request.headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &serde_json::json!({"access_token": "at"}));
        let flow = flow(ClientAuthMethod::ClientSecretBasic, transport.clone());

        flow.refresh("rt").await.unwrap();

        let request = transport.get_last_request().unwrap();
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Basic aWQ6czNjcmV0")
        );
        let body = request.body.unwrap();
        assert!(body.contains("grant_type=refresh_token"));
        assert!(!body.contains("client_secret"));
        assert!(!body.contains("client_id"));
    }

    #[tokio::test]
    async fn test_error_response_is_mapped() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            400,
            &serde_json::json!({"error": "invalid_grant", "error_description": "Bad code"}),
        );
        let flow = flow(ClientAuthMethod::ClientSecretPost, transport);

        let err = flow
            .exchange_code(&CodeExchangeRequest {
                code: "bad".to_string(),
                redirect_uri: "http://localhost/cb".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OAuth2Error::Provider(ProviderError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, &serde_json::json!({"token_type": "Bearer"}));
        let flow = flow(ClientAuthMethod::ClientSecretPost, transport);

        let err = flow.refresh("rt").await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Protocol(ProtocolError::InvalidJson { .. })));
    }
}
