//! OAuth2 Client
//!
//! One provider's client: endpoints and credentials from its flow, plus the
//! token state obtained or restored during a request. Clones share the same
//! token state, so the copy cached by the factory and the copy handed to the
//! application always agree.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{decode_id_token, IdTokenVerification};
use crate::error::{OAuth2Result, RequestError};
use crate::flows::{AuthorizationCodeFlow, CodeExchangeRequest};
use crate::types::{AuthOptions, IdTokenClaims, TokenAttribute, TokenResponse};

#[derive(Clone, Debug, Default)]
struct TokenState {
    code: Option<String>,
    redirect_uri: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    issued_at: Option<DateTime<Utc>>,
    id_token: Option<String>,
}

impl TokenState {
    fn apply(&mut self, response: TokenResponse) {
        self.access_token = Some(response.access_token);
        self.token_type = Some(response.token_type);
        self.expires_in = response.expires_in;
        self.issued_at = Some(Utc::now());
        // Refresh responses usually omit the refresh token; keep the old one.
        if response.refresh_token.is_some() {
            self.refresh_token = response.refresh_token;
        }
        if response.id_token.is_some() {
            self.id_token = response.id_token;
        }
    }
}

/// OAuth2 client for one provider.
#[derive(Clone)]
pub struct OAuth2Client {
    flow: Arc<AuthorizationCodeFlow>,
    verification: Option<IdTokenVerification>,
    state: Arc<Mutex<TokenState>>,
}

impl OAuth2Client {
    /// Create a client with no token state.
    pub fn new(flow: Arc<AuthorizationCodeFlow>, verification: Option<IdTokenVerification>) -> Self {
        Self {
            flow,
            verification,
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Whether both handles refer to the same client instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn client_id(&self) -> &str {
        &self.flow.credentials().client_id
    }

    /// Authorization URL for the given options.
    pub fn authorization_uri(&self, options: &AuthOptions) -> String {
        self.flow.build_authorization_url(options)
    }

    pub fn code(&self) -> Option<String> {
        self.state.lock().code.clone()
    }

    pub fn set_code(&self, code: impl Into<String>) {
        self.state.lock().code = Some(code.into());
    }

    pub fn redirect_uri(&self) -> Option<String> {
        self.state.lock().redirect_uri.clone()
    }

    pub fn set_redirect_uri(&self, redirect_uri: impl Into<String>) {
        self.state.lock().redirect_uri = Some(redirect_uri.into());
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().refresh_token.clone()
    }

    pub fn token_type(&self) -> Option<String> {
        self.state.lock().token_type.clone()
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.state.lock().expires_in
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().issued_at
    }

    pub fn id_token(&self) -> Option<String> {
        self.state.lock().id_token.clone()
    }

    /// When the access token expires, if both issue time and lifetime are known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock();
        let issued_at = state.issued_at?;
        let expires_in = i64::try_from(state.expires_in?).ok()?;
        issued_at.checked_add_signed(ChronoDuration::seconds(expires_in))
    }

    /// Whether the access token is known to have expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map_or(false, |at| at <= Utc::now())
    }

    /// Current value of a token attribute, as stored in a token bag.
    pub fn token_attribute(&self, attr: TokenAttribute) -> Option<Value> {
        let state = self.state.lock();
        match attr {
            TokenAttribute::AccessToken => state.access_token.clone().map(Value::String),
            TokenAttribute::RefreshToken => state.refresh_token.clone().map(Value::String),
            TokenAttribute::IdToken => state.id_token.clone().map(Value::String),
            TokenAttribute::TokenType => state.token_type.clone().map(Value::String),
            TokenAttribute::ExpiresIn => state.expires_in.map(Value::from),
            TokenAttribute::IssuedAt => state.issued_at.map(|t| Value::from(t.timestamp())),
        }
    }

    /// Assign a token attribute from a token bag value.
    ///
    /// Values of the wrong shape are skipped.
    pub fn set_token_attribute(&self, attr: TokenAttribute, value: &Value) {
        let mut state = self.state.lock();
        let applied = match attr {
            TokenAttribute::AccessToken => assign(&mut state.access_token, as_string(value)),
            TokenAttribute::RefreshToken => assign(&mut state.refresh_token, as_string(value)),
            TokenAttribute::IdToken => assign(&mut state.id_token, as_string(value)),
            TokenAttribute::TokenType => assign(&mut state.token_type, as_string(value)),
            TokenAttribute::ExpiresIn => assign(&mut state.expires_in, as_u64(value)),
            TokenAttribute::IssuedAt => assign(&mut state.issued_at, as_timestamp(value)),
        };
        if !applied {
            warn!(attribute = attr.as_str(), "skipping stored token attribute with unexpected type");
        }
    }

    /// Exchange the authorization code for tokens.
    ///
    /// The code is single use and is cleared once the exchange succeeds.
    pub async fn fetch_access_token(&self) -> OAuth2Result<()> {
        let request = {
            let state = self.state.lock();
            let code = state
                .code
                .clone()
                .filter(|c| !c.is_empty())
                .ok_or(RequestError::MissingCode)?;
            CodeExchangeRequest {
                code,
                redirect_uri: state.redirect_uri.clone().unwrap_or_default(),
            }
        };

        let response = self.flow.exchange_code(&request).await?;

        let mut state = self.state.lock();
        state.apply(response);
        state.code = None;
        debug!(has_refresh_token = state.refresh_token.is_some(), "access token fetched");
        Ok(())
    }

    /// Renew the access token with the refresh token.
    pub async fn refresh_access_token(&self) -> OAuth2Result<()> {
        let refresh_token = self
            .refresh_token()
            .ok_or(RequestError::NoRefreshToken)?;

        let response = self.flow.refresh(&refresh_token).await?;

        self.state.lock().apply(response);
        debug!("access token refreshed");
        Ok(())
    }

    /// Claims of the identity token, if the client holds one.
    pub fn decoded_id_token(&self) -> OAuth2Result<Option<IdTokenClaims>> {
        match self.id_token() {
            Some(token) => decode_id_token(&token, self.verification.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    /// Subject of the identity token, if the client holds one.
    pub fn subject_id(&self) -> OAuth2Result<Option<String>> {
        Ok(self.decoded_id_token()?.map(|claims| claims.sub))
    }
}

impl std::fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("OAuth2Client")
            .field("client_id", &self.client_id())
            .field("redirect_uri", &state.redirect_uri)
            .field("has_code", &state.code.is_some())
            .field("has_access_token", &state.access_token.is_some())
            .field("has_refresh_token", &state.refresh_token.is_some())
            .field("expires_in", &state.expires_in)
            .finish_non_exhaustive()
    }
}

fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}
