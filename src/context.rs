//! Run-scoped context shared by the orchestrator and identifier generation

use std::path::{Path, PathBuf};

/// Values fixed for the whole run, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Scopes every storage path to this execution
    pub run_id: String,
    /// Configuration id used to namespace table and path names
    pub account: String,
    /// Root data directory (`config.yml` lives here, output goes to `out/tables`)
    pub data_dir: PathBuf,
}

impl RunContext {
    /// Create a new run context
    pub fn new(
        run_id: impl Into<String>,
        account: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            account: account.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Generate a run id from the current UTC time, used when none is supplied
    pub fn generated_run_id() -> String {
        chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
    }

    /// Directory receiving downloaded tables and manifests
    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("out").join("tables")
    }

    /// Root data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
