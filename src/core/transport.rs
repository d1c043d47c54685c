//! HTTP Transport
//!
//! Outbound HTTP interface used for token endpoint calls. A provider's
//! `connection` option replaces the default reqwest transport with any
//! implementation of [`HttpTransport`].

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{NetworkError, OAuth2Error, ProtocolError};

/// Largest token endpoint response accepted.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// Token endpoint request. Always sent as a POST.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// JSON response with the given status.
    pub fn json<T: serde::Serialize>(status: u16, body: &T) -> Result<Self, OAuth2Error> {
        let body = serde_json::to_string(body).map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;
        Ok(Self {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body,
        })
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuth2Error>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, OAuth2Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Token endpoints answer directly; a redirect is a protocol error.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NetworkError::TlsError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuth2Error> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = self.client.post(&request.url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                OAuth2Error::Network(NetworkError::Timeout { timeout })
            } else {
                OAuth2Error::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();

        if (300..400).contains(&status) {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(OAuth2Error::Protocol(ProtocolError::UnexpectedRedirect {
                location,
            }));
        }

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(OAuth2Error::Protocol(ProtocolError::ResponseTooLarge {
                    size: len as usize,
                }));
            }
        }

        let body = response.text().await.map_err(|e| {
            OAuth2Error::Protocol(ProtocolError::InvalidResponse {
                message: e.to_string(),
            })
        })?;

        if body.len() > self.max_response_size {
            return Err(OAuth2Error::Protocol(ProtocolError::ResponseTooLarge {
                size: body.len(),
            }));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock HTTP transport for testing. Queued responses are returned in order.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, OAuth2Error>>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        match HttpResponse::json(status, body) {
            Ok(response) => self.queue_response(response),
            Err(e) => self.queue_error(e),
        }
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: OAuth2Error) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self.default_response.lock() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OAuth2Error> {
        self.request_history.lock().push(request);

        if let Some(queued) = self.responses.lock().pop_front() {
            return queued;
        }

        self.default_response.lock().clone().ok_or_else(|| {
            OAuth2Error::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            url: url.to_string(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_mock_transport_returns_in_order() {
        let transport = MockHttpTransport::new();
        transport
            .queue_json_response(200, &serde_json::json!({"n": 1}))
            .queue_json_response(500, &serde_json::json!({"n": 2}));

        let first = transport.send(request("https://example.com/1")).await.unwrap();
        let second = transport.send(request("https://example.com/2")).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(second.status, 500);

        let history = transport.get_requests();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].url, "https://example.com/1");
    }

    #[tokio::test]
    async fn test_mock_transport_empty_queue() {
        let transport = MockHttpTransport::new();
        let err = transport.send(request("https://example.com")).await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Network(NetworkError::ConnectionFailed { .. })));

        transport.set_default_response(HttpResponse {
            status: 204,
            headers: HashMap::new(),
            body: String::new(),
        });
        let response = transport.send(request("https://example.com")).await.unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(transport.get_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_queued_error() {
        let transport = MockHttpTransport::new();
        transport.queue_error(OAuth2Error::Network(NetworkError::Timeout {
            timeout: Duration::from_secs(1),
        }));
        let err = transport.send(request("https://example.com")).await.unwrap_err();
        assert!(matches!(err, OAuth2Error::Network(NetworkError::Timeout { .. })));
    }
}
