//! Local layout of downloaded tables
//!
//! Every enabled query produces, under `<data dir>/out/tables`:
//!
//! ```text
//! <outputTableId>.<format>.gz/            one file per exported shard
//! <outputTableId>.<format>.gz.manifest    YAML sidecar
//! ```

use super::{OutputError, OutputResult};
use crate::api::CloudFile;
use crate::config::ExportFormat;
use crate::context::RunContext;
use std::path::{Path, PathBuf};

/// Paths of one query's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutput {
    /// Directory holding the shards
    pub table_dir: PathBuf,
    /// Manifest file next to the directory
    pub manifest_path: PathBuf,
}

impl TableOutput {
    /// Destination of a downloaded shard: the last segment of the object name
    pub fn shard_path(&self, file: &CloudFile) -> OutputResult<PathBuf> {
        let name = sanitize_component(file.file_name());
        if name.is_empty() || name == "." {
            return Err(OutputError::InvalidPath(file.name.clone()));
        }
        Ok(self.table_dir.join(name))
    }

    /// Create the shard directory (and `out/tables`) if missing
    pub fn ensure_directories(&self) -> OutputResult<()> {
        std::fs::create_dir_all(&self.table_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                self.table_dir.display(),
                e
            ))
        })
    }
}

/// Builder of [`TableOutput`] paths rooted at the tables directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    tables_dir: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `tables_dir`
    pub fn new(tables_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables_dir: tables_dir.into(),
        }
    }

    /// Layout rooted at the run's `out/tables`
    pub fn for_run(ctx: &RunContext) -> Self {
        Self::new(ctx.tables_dir())
    }

    /// Root directory
    pub fn tables_dir(&self) -> &Path {
        &self.tables_dir
    }

    /// Paths for the table `output_table_id` exported as `format`
    pub fn table(&self, output_table_id: &str, format: ExportFormat) -> OutputResult<TableOutput> {
        let base = sanitize_component(output_table_id);
        if base.trim().is_empty() {
            return Err(OutputError::InvalidPath(output_table_id.to_string()));
        }

        let dir_name = format!("{base}.{}.gz", format.extension());
        Ok(TableOutput {
            table_dir: self.tables_dir.join(&dir_name),
            manifest_path: self.tables_dir.join(format!("{dir_name}.manifest")),
        })
    }
}

/// Sanitize a single path component for filesystem safety
///
/// Prevents path traversal by replacing:
/// - `/`, `\` → `_` (directory separators)
/// - `..` → `__` (parent directory reference)
fn sanitize_component(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', '\0'], "_")
}
