//! Crate-level error aggregating every module's errors

use crate::api::{ApiError, TransportError};
use crate::config::ConfigError;
use crate::identifier::IdentifierError;
use crate::job::JobError;
use crate::output::OutputError;

/// Extractor errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Job error
    #[error(transparent)]
    Job(#[from] JobError),

    /// Identifier error
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Output error
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Failure reported to the user as is
    #[error("{0}")]
    User(String),
}

impl From<TransportError> for ExtractorError {
    fn from(err: TransportError) -> Self {
        ExtractorError::Api(err.into())
    }
}

impl ExtractorError {
    /// Whether the error is caused by user input or the user's remote setup.
    ///
    /// User errors exit with code 1, everything else with code 2.
    pub fn is_user_error(&self) -> bool {
        match self {
            ExtractorError::Config(err) => err.is_user_error(),
            ExtractorError::Api(err) => err.is_user_error(),
            ExtractorError::Job(err) => err.is_user_error(),
            ExtractorError::Identifier(_) => true,
            ExtractorError::Output(_) => false,
            ExtractorError::User(_) => true,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_user_error() {
            1
        } else {
            2
        }
    }
}

/// Result type for extractor operations
pub type ExtractorResult<T> = Result<T, ExtractorError>;
