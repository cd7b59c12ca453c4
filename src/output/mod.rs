//! Local output: shard directories and manifests

pub mod manifest;
pub mod path;

pub use manifest::Manifest;
pub use path::{OutputLayout, TableOutput};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Name cannot be turned into a safe path
    #[error("invalid output path: '{0}'")]
    InvalidPath(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
