//! Request Types
//!
//! The intercepted request and the response handed back to the host.

use bytes::Bytes;
use http::header::{HeaderName, HOST, LOCATION};
use http::uri::Authority;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use std::collections::HashMap;

use crate::error::{OAuth2Result, ProtocolError};
use crate::middleware::RequestContext;

/// Session key holding the signed-in user id.
pub const SESSION_USER_ID: &str = "user_id";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Session values provided by the host's session middleware.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    values: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a signed-in user.
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.insert(SESSION_USER_ID, user_id);
        session
    }

    /// The signed-in user id, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.get(SESSION_USER_ID)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// An incoming request together with its per-request context.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub context: RequestContext,
}

impl Request {
    /// Create a request with an empty body and context.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: RequestContext::new(),
        }
    }

    /// Create a GET request.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach the session.
    pub fn session(mut self, session: Session) -> Self {
        self.context.set_session(session);
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Scheme the client used: from the URI, then `X-Forwarded-Proto`, else `http`.
    pub fn scheme(&self) -> &str {
        if let Some(scheme) = self.uri.scheme_str() {
            return scheme;
        }
        match self
            .headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
        {
            Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
            _ => "http",
        }
    }

    /// Host the client addressed, with the port unless it is the scheme default.
    pub fn host_with_port(&self) -> Option<String> {
        let authority = self
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Authority>().ok())
            .or_else(|| self.uri.authority().cloned())?;

        let default_port = match self.scheme() {
            "https" => 443,
            _ => 80,
        };

        match authority.port_u16() {
            Some(port) if port != default_port => Some(format!("{}:{}", authority.host(), port)),
            _ => Some(authority.host().to_string()),
        }
    }
}

/// Response returned to the host.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 response with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Self::new(StatusCode::OK)
        }
    }

    /// 302 redirect with an empty body.
    pub fn redirect(location: &str) -> OAuth2Result<Self> {
        let value = HeaderValue::from_str(location).map_err(|e| ProtocolError::InvalidResponse {
            message: format!("invalid redirect location: {}", e),
        })?;
        let mut response = Self::new(StatusCode::FOUND);
        response.headers.insert(LOCATION, value);
        Ok(response)
    }

    /// The `Location` header.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}
