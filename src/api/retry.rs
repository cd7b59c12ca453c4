//! Retry classification and log formatting

use super::transport::TransportError;
use std::time::Duration;

/// Why a request is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Request timed out
    Timeout,
    /// Connection refused, DNS failure and the like
    Connect,
    /// Other transport failure
    Network,
    /// HTTP 429
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
}

impl RetryReason {
    /// Classify a transport failure, `None` when it must not be retried
    pub fn from_transport(err: &TransportError) -> Option<Self> {
        match err {
            TransportError::Timeout(_) => Some(Self::Timeout),
            TransportError::Connect(_) => Some(Self::Connect),
            TransportError::Request(_) => Some(Self::Network),
            TransportError::Io(_) => None,
        }
    }

    /// Classify an HTTP status, `None` when it must not be retried
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            429 => Some(Self::RateLimit),
            500..=599 => Some(Self::ServerError(status)),
            _ => None,
        }
    }

    /// Short description used in retry log lines
    pub fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "network timeout",
            Self::Connect => "connection failed",
            Self::Network => "network error",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
        }
    }
}

/// Format the warning logged before a retry.
///
/// `attempt` is the 1-based number of the attempt that just failed.
pub fn format_retry(
    attempt: u32,
    max_attempts: u32,
    reason: RetryReason,
    backoff: Duration,
    endpoint: &str,
) -> String {
    format!(
        "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... [{}]",
        attempt,
        max_attempts,
        reason.description(),
        backoff.as_secs_f64(),
        endpoint
    )
}
