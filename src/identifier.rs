//! Deterministic identifier generation
//!
//! Every warehouse and storage name the extractor touches is derived here from
//! the [`RunContext`], the [`QueryConfig`] and the [`ProjectContext`]. The
//! functions are pure: identical inputs always produce byte-identical output.
//!
//! Names are sanitized to `[A-Za-z0-9_]`: characters outside letters, digits,
//! underscores, dashes and ASCII whitespace are dropped, then every run of
//! ASCII whitespace or dashes becomes a single underscore.

use crate::config::{ProjectContext, QueryConfig};
use crate::context::RunContext;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of the per-region scratch dataset
pub const CACHE_DATASET_PREFIX: &str = "kbc_extractor";

/// Bucket namespace used when a query has no explicit output table
pub const DEFAULT_OUTPUT_BUCKET: &str = "in.c-ex-google-bigquery";

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_[:space:]-]").expect("static regex is valid"));

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[[:space:]-]+").expect("static regex is valid"));

static STORAGE_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^gs://([^/]+)(.*)$").expect("static regex is valid"));

/// Errors that can occur while deriving identifiers
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// Storage URI does not look like `gs://bucket/path`
    #[error("Invalid Cloud Storage Path given: '{0}'")]
    InvalidStoragePath(String),
}

/// Reduce `input` to the safe identifier alphabet.
///
/// # Examples
///
/// ```
/// use bigquery_extractor::identifier::sanitize;
///
/// assert_eq!(sanitize("Big Query - Test!"), "Big_Query_Test");
/// assert_eq!(sanitize("Big_Query_Test"), "Big_Query_Test");
/// ```
pub fn sanitize(input: &str) -> String {
    let stripped = DISALLOWED_CHARS.replace_all(input, "");
    SEPARATOR_RUNS.replace_all(&stripped, "_").into_owned()
}

/// Scratch dataset for a region, e.g. `kbc_extractor_europe_west1`
pub fn cache_dataset_id(location: &str) -> String {
    format!(
        "{CACHE_DATASET_PREFIX}_{}",
        location.to_lowercase().replace('-', "_")
    )
}

/// Cache table holding the result of `query` for `account`
pub fn table_name(account: &str, query: &QueryConfig) -> String {
    sanitize(&format!("{account}_{}", query.name))
}

/// File name prefix shared by every exported shard of `query`
pub fn file_name_prefix(query: &QueryConfig) -> String {
    sanitize(&query.name)
}

/// Glob URI handed to the export job; the warehouse replaces `*` with a
/// shard number, so the result names many files.
pub fn export_path(ctx: &RunContext, query: &QueryConfig, project: &ProjectContext) -> String {
    format!(
        "{}/runId-{}/{}/{}_*.{}.gz",
        project.storage.trim_end_matches('/'),
        ctx.run_id,
        sanitize(&ctx.account),
        file_name_prefix(query),
        query.format.extension()
    )
}

/// Object name prefix matching every shard written by [`export_path`]
///
/// # Errors
///
/// Returns [`IdentifierError::InvalidStoragePath`] unless `project.storage`
/// starts with `gs://<bucket>`.
pub fn export_mask(
    ctx: &RunContext,
    query: &QueryConfig,
    project: &ProjectContext,
) -> Result<String, IdentifierError> {
    let (_, path) = split_storage_uri(&project.storage)?;
    let mask = format!(
        "{}/runId-{}/{}/{}_",
        path.trim_matches('/'),
        ctx.run_id,
        sanitize(&ctx.account),
        file_name_prefix(query)
    );
    Ok(mask.trim_start_matches('/').to_string())
}

/// Bucket component of `project.storage`
pub fn storage_bucket(project: &ProjectContext) -> Result<String, IdentifierError> {
    split_storage_uri(&project.storage).map(|(bucket, _)| bucket.to_string())
}

/// Destination table id written into the manifest
pub fn output_table_id(account: &str, query: &QueryConfig) -> String {
    match query.output_table.as_deref().map(str::trim) {
        Some(table) if !table.is_empty() => table.to_string(),
        _ => format!(
            "{DEFAULT_OUTPUT_BUCKET}-{}.{}",
            sanitize(account),
            file_name_prefix(query)
        ),
    }
}

fn split_storage_uri(storage: &str) -> Result<(&str, &str), IdentifierError> {
    let captures = STORAGE_URI
        .captures(storage)
        .ok_or_else(|| IdentifierError::InvalidStoragePath(storage.to_string()))?;

    match (captures.get(1), captures.get(2)) {
        (Some(bucket), Some(path)) => Ok((bucket.as_str(), path.as_str())),
        _ => Err(IdentifierError::InvalidStoragePath(storage.to_string())),
    }
}
