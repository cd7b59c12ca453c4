//! Request payloads of query and export jobs

use serde::Serialize;

/// Write disposition of the cache table
pub const WRITE_DISPOSITION: &str = "WRITE_TRUNCATE";

/// Compression of exported shards
pub const EXPORT_COMPRESSION: &str = "GZIP";

/// Body POSTed to the job collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    /// Job configuration
    pub configuration: JobConfiguration,
}

/// `configuration`, keyed by job type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobConfiguration {
    /// `configuration.query`
    Query(QueryJobConfig),
    /// `configuration.extract`
    Extract(ExtractJobConfig),
}

/// Fully qualified table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    /// Project id
    pub project_id: String,
    /// Dataset id
    pub dataset_id: String,
    /// Table id
    pub table_id: String,
}

/// Query job configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJobConfig {
    /// Flatten nested and repeated fields
    pub flatten_results: bool,
    /// Legacy SQL dialect
    pub use_legacy_sql: bool,
    /// Always true, results go to a destination table
    pub allow_large_results: bool,
    /// SQL text
    pub query: String,
    /// Cache table receiving the result
    pub destination_table: TableReference,
    /// Reuse cached results
    pub use_query_cache: bool,
    /// Cache table write mode
    pub write_disposition: String,
}

/// Extract job configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractJobConfig {
    /// Shard compression
    pub compression: String,
    /// `CSV` or `NEWLINE_DELIMITED_JSON`
    pub destination_format: String,
    /// Cache table to export
    pub source_table: TableReference,
    /// Header row in CSV shards
    pub print_header: bool,
    /// Glob URIs of the shards
    pub destination_uris: Vec<String>,
}
