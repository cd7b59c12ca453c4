//! Authenticated HTTP transport seam
//!
//! The API client never talks to `reqwest` directly: every request goes
//! through a [`Transport`], which owns authentication (and token refresh).
//! Production code uses [`super::oauth::OAuthTransport`]; tests script
//! responses in memory.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Transport-level failures (no HTTP status was obtained)
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),

    /// Local filesystem failure while downloading
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Query parameters, in order
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Create a request with no parameters or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// DELETE request
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// POST request carrying a JSON body
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, url)
        }
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of the first query parameter named `key`
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Received response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// `2xx`
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Authenticated HTTP transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response, whatever its status
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Stream the body of `url` into `destination`
    ///
    /// The returned response carries the status and, for non-success
    /// statuses, the error body. Nothing is written unless the status is `2xx`.
    async fn download(&self, url: &str, destination: &Path)
        -> Result<HttpResponse, TransportError>;
}
