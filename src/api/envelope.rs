//! Classification of Google API error bodies
//!
//! Two body shapes are recognised for responses below `500`:
//!
//! - REST errors: `{"error": {"errors": [{domain, location, reason, message}], "message": ...}}`
//! - OAuth token errors: `{"error": "invalid_grant", "error_description": "..."}`
//!
//! Both become [`ApiError::Classified`] with a `"Google API Error: "` prefix.
//! Any other body is reported as [`ApiError::UnexpectedStatus`].

use super::ApiError;
use serde::Deserialize;

/// Prefix of every user-facing API error message
pub const MESSAGE_PREFIX: &str = "Google API Error: ";

const REAUTHORIZE_HINT: &str = " - Try re-authorize your account";

/// One entry of an `errors` array (request or job status)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    /// Error domain, e.g. `global`
    #[serde(default)]
    pub domain: Option<String>,
    /// Offending location, e.g. a parameter name
    #[serde(default)]
    pub location: Option<String>,
    /// Machine readable reason, e.g. `notFound`
    #[serde(default)]
    pub reason: Option<String>,
    /// Human readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorDetail {
    /// `[DOMAIN] [LOCATION] [REASON] message`, absent parts omitted
    pub fn describe(&self) -> String {
        let tags = [&self.domain, &self.location, &self.reason]
            .into_iter()
            .flatten()
            .map(|tag| format!("[{}]", tag.to_uppercase()));
        tags.chain(self.message.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Structured(StructuredError),
    Code(String),
}

#[derive(Deserialize)]
struct StructuredError {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct JobStatusBody {
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    #[serde(default)]
    error_result: Option<ErrorDetail>,
}

/// Classify a non-success response
pub fn classify(status: u16, body: &[u8]) -> ApiError {
    if status >= 500 {
        return ApiError::Server {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        };
    }

    match user_message(body) {
        Some(message) => ApiError::Classified(message),
        None => ApiError::UnexpectedStatus {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

/// User-facing message for a recognised error body
pub fn user_message(body: &[u8]) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;

    let message = match envelope.error? {
        ErrorField::Structured(error) => match error.errors.first() {
            Some(first) => first.describe(),
            None => error.message.filter(|m| !m.is_empty())?,
        },
        ErrorField::Code(code) if code.is_empty() => return None,
        ErrorField::Code(code) => {
            let mut message = match envelope.error_description {
                Some(description) => format!("{description} ({code})"),
                None => code,
            };
            if message.contains("invalid_grant") {
                message.push_str(REAUTHORIZE_HINT);
            }
            message
        }
    };

    Some(format!("{MESSAGE_PREFIX}{message}"))
}

/// Job-level error carried by a job resource body.
///
/// A non-empty `status.errors` wins; otherwise `status.errorResult` is used.
pub fn job_status_error(body: &serde_json::Value) -> Option<String> {
    let parsed: JobStatusBody = serde_json::from_value(body.clone()).ok()?;
    let status = parsed.status?;

    let detail = status
        .errors
        .into_iter()
        .next()
        .or(status.error_result)?;

    Some(format!("{MESSAGE_PREFIX}{}", detail.describe()))
}
