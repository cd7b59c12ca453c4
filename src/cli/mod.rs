//! Command line interface

use crate::api::config::DEFAULT_MAX_ATTEMPTS;
use crate::api::{ApiClient, BackoffPolicy, Endpoints, OAuthTransport};
use crate::config::{ConfigError, ExtractorConfig};
use crate::context::RunContext;
use crate::error::ExtractorResult;
use crate::extractor::{ActionResponse, Extractor};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// BigQuery extractor CLI
#[derive(Parser, Debug)]
#[command(name = "bigquery-extractor")]
#[command(about = "Extract BigQuery query results through Cloud Storage", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory holding config.yml; output goes to <DATA>/out/tables
    #[arg(long, env = "KBC_DATADIR")]
    pub data: Option<PathBuf>,

    /// Run identifier scoping Cloud Storage paths (default: current UTC timestamp)
    #[arg(long, env = "KBC_RUNID")]
    pub run_id: Option<String>,

    /// Configuration id used to namespace table and path names
    #[arg(long, env = "KBC_CONFIGID", default_value = "default")]
    pub config_id: String,

    /// Maximum attempts for failed requests (default: 5, range: 1-20)
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Base URL replacing https://www.googleapis.com (for emulators)
    #[arg(long, env = "GOOGLE_API_BASE_URL", hide = true)]
    pub api_base_url: Option<String>,
}

impl Cli {
    /// Resolve the run context from arguments and environment
    pub fn run_context(&self) -> Result<RunContext, ConfigError> {
        let data_dir = self
            .data
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(ConfigError::MissingDataDir)?;

        let run_id = match self.run_id.as_deref().map(str::trim) {
            Some(run_id) if !run_id.is_empty() => run_id.to_string(),
            _ => RunContext::generated_run_id(),
        };

        Ok(RunContext::new(run_id, self.config_id.clone(), data_dir.clone()))
    }

    /// Service endpoints, honouring the base URL override
    pub fn endpoints(&self) -> Endpoints {
        self.api_base_url
            .as_deref()
            .map(Endpoints::with_base)
            .unwrap_or_default()
    }

    /// Load the configuration and run its action
    pub async fn execute(&self) -> ExtractorResult<Option<ActionResponse>> {
        let context = self.run_context()?;
        let config = ExtractorConfig::load(context.data_dir())?;
        debug!(
            "Running action {} (run id {}, config id {})",
            config.action, context.run_id, context.account
        );

        let endpoints = self.endpoints();
        let transport =
            OAuthTransport::new(config.credentials.clone())?.with_token_url(endpoints.token.clone());
        let client = ApiClient::new(Arc::new(transport))
            .with_endpoints(endpoints)
            .with_backoff(BackoffPolicy::with_max_attempts(self.max_attempts));

        Extractor::new(client, context).execute(&config).await
    }
}
