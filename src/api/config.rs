//! API client constants and backoff policy

use std::time::Duration;

/// Total attempts for a retryable request (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff unit in production, one second
pub const BACKOFF_UNIT_MS: u64 = 1000;

/// Backoff cap in units.
/// Also bounds the job poll interval, so a long running job is polled at
/// least every 20 seconds.
pub const MAX_BACKOFF_UNITS: u64 = 20;

/// Page size for every listing endpoint
pub const PAGE_SIZE: u32 = 50;

/// Safety cap on pages fetched by one listing
pub const MAX_PAGES: usize = 10_000;

/// Fields requested when listing storage objects
pub const OBJECT_LIST_FIELDS: &str = "items(mediaLink,id,name,bucket),nextPageToken,prefixes";

/// BigQuery REST base
pub const BIGQUERY_ENDPOINT: &str = "https://www.googleapis.com/bigquery/v2";

/// Cloud Storage JSON API base
pub const STORAGE_ENDPOINT: &str = "https://www.googleapis.com/storage/v1";

/// OAuth token endpoint
pub const TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Calculate exponential backoff delay: `min(2^n, 20)` seconds
pub fn calculate_backoff(attempt: u32) -> Duration {
    BackoffPolicy::default().delay(attempt)
}

/// Backoff schedule shared by request retries and job polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Duration of one backoff unit
    pub unit: Duration,
    /// Total attempts for a retryable request
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_millis(BACKOFF_UNIT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl BackoffPolicy {
    /// Policy with the default unit and `max_attempts` attempts (at least one)
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Policy that never sleeps, for tests
    pub fn immediate() -> Self {
        Self {
            unit: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before retry (or poll) number `attempt`, 0-indexed
    pub fn delay(&self, attempt: u32) -> Duration {
        let units = 2u64
            .checked_pow(attempt)
            .unwrap_or(u64::MAX)
            .min(MAX_BACKOFF_UNITS);
        // units <= 20, fits in u32
        self.unit * units as u32
    }
}
