//! # BigQuery Extractor Library
//!
//! Extracts the results of configured BigQuery queries to local gzip files.
//! Each query result is materialised in a regional cache dataset, exported to
//! Cloud Storage as sharded gzip files, downloaded into `out/tables` together
//! with a YAML manifest, and finally removed from Cloud Storage.
//!
//! ## Features
//!
//! - **Actions**: `run`, `listProjects`, `listBuckets`
//! - **Job Polling**: exponential backoff (`min(2^n, 20)` seconds), no deadline
//! - **Retry**: transport failures, 5xx and 429 responses are retried
//! - **Classified Errors**: Google error bodies become `"Google API Error: ..."`
//! - **OAuth**: access token refresh on 401
//!
//! ## Quick Start
//!
//! ```no_run
//! use bigquery_extractor::api::{ApiClient, OAuthTransport};
//! use bigquery_extractor::config::ExtractorConfig;
//! use bigquery_extractor::context::RunContext;
//! use bigquery_extractor::extractor::Extractor;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = RunContext::new("1234", "my-config", "/data");
//! let config = ExtractorConfig::load(context.data_dir())?;
//!
//! let transport = OAuthTransport::new(config.credentials.clone())?;
//! let client = ApiClient::new(Arc::new(transport));
//!
//! if let Some(response) = Extractor::new(client, context).execute(&config).await? {
//!     println!("{}", serde_json::to_string(&response)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Deterministic dataset, table and storage path names
//! - [`api`] - Transport, retrying API client and error classification
//! - [`job`] - Query/export job submission and polling
//! - [`output`] - Shard layout and manifests
//! - [`extractor`] - Action dispatch and the per-query pipeline
//! - [`config`] - Configuration loading and per-action validation

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Google REST API access
pub mod api;

/// Command line interface
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// Run-scoped context
pub mod context;

/// Crate-level error type
pub mod error;

/// Extraction orchestration
pub mod extractor;

/// Deterministic identifier generation
pub mod identifier;

/// Remote job submission and polling
pub mod job;

/// Local output layout and manifests
pub mod output;

// Re-export commonly used types
pub use config::{Action, ExportFormat, ExtractorConfig, ProjectContext, QueryConfig};
pub use context::RunContext;
pub use error::{ExtractorError, ExtractorResult};
pub use extractor::{ActionResponse, Extractor};
