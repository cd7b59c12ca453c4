//! Google REST API access
//!
//! This module provides:
//! - The [`Transport`] seam and its OAuth implementation
//! - [`ApiClient`] with retry/backoff and the BigQuery and Cloud Storage
//!   resource verbs the extractor needs
//! - Classification of error bodies into user-facing messages

pub mod client;
pub mod config;
pub mod envelope;
pub mod oauth;
pub mod resources;
pub mod retry;
pub mod transport;

pub use client::{ApiClient, Endpoints};
pub use config::BackoffPolicy;
pub use oauth::OAuthTransport;
pub use resources::{BucketInfo, CloudFile, Dataset, ProjectInfo, TableColumn};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Recognised Google error, message is user-facing
    #[error("{0}")]
    Classified(String),

    /// Transport failure, after retries
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 5xx or 429 response, after retries
    #[error("Server error {status}: {body}")]
    Server {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Non-success response without a recognisable error body
    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Success response that could not be interpreted
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Endpoint base is not a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether the message is meant for the end user
    pub fn is_user_error(&self) -> bool {
        matches!(self, ApiError::Classified(_))
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
