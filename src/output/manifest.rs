//! Table manifest written next to the downloaded shards

use super::{OutputError, OutputResult};
use crate::api::TableColumn;
use crate::config::QueryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Field delimiter of exported CSV shards
pub const DELIMITER: &str = ",";

/// Field enclosure of exported CSV shards
pub const ENCLOSURE: &str = "\"";

/// Manifest describing a downloaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Destination table id
    pub destination: String,
    /// Field delimiter
    pub delimiter: String,
    /// Field enclosure
    pub enclosure: String,
    /// Primary key columns
    pub primary_key: Vec<String>,
    /// Incremental load
    pub incremental: bool,
    /// Column names, in schema order
    pub columns: Vec<String>,
}

impl Manifest {
    /// Manifest for `query` loaded into `destination` with the given schema
    pub fn new(destination: impl Into<String>, query: &QueryConfig, columns: &[TableColumn]) -> Self {
        Self {
            destination: destination.into(),
            delimiter: DELIMITER.to_string(),
            enclosure: ENCLOSURE.to_string(),
            primary_key: query.primary_key.clone(),
            incremental: query.incremental,
            columns: columns.iter().map(|column| column.name.clone()).collect(),
        }
    }

    /// Write the manifest as YAML to `path`
    pub fn write(&self, path: &Path) -> OutputResult<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|e| {
            OutputError::IoError(format!("Failed to write manifest {}: {}", path.display(), e))
        })
    }

    /// Read a manifest back from `path`
    pub fn read(path: &Path) -> OutputResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OutputError::IoError(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| OutputError::SerializationError(e.to_string()))
    }
}
