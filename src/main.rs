//! Main entry point for the bigquery-extractor CLI

use bigquery_extractor::cli::Cli;
use bigquery_extractor::ActionResponse;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bigquery_extractor=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn print_response(response: &ActionResponse) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(response)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    match cli.execute().await {
        Ok(response) => {
            if let Some(response) = response {
                if let Err(e) = print_response(&response) {
                    error!("Application error: {}", e);
                    std::process::exit(2);
                }
            }
            info!("Extractor finished successfully.");
        }
        Err(e) if e.is_user_error() => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
        Err(e) => {
            error!("Application error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
