//! Configuration loading and validation
//!
//! The extractor reads `<data dir>/config.yml` (or `config.json`). Parsing is
//! done in two steps: `serde_yaml` fills loosely typed raw sections, then the
//! sections are validated according to the requested [`Action`]. The result is
//! an [`ExtractorConfig`] that is guaranteed to carry every field the action
//! needs.

mod action;

pub use action::{Action, GoogleField};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::error;

/// Location used for the cache dataset when none is configured
pub const DEFAULT_LOCATION: &str = "US";

/// Configuration file names, in lookup order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["config.yml", "config.json"];

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No data directory supplied
    #[error("Data folder not set.")]
    MissingDataDir,

    /// No configuration file in the data directory
    #[error("Missing configuration file.")]
    MissingConfigFile,

    /// Configuration file is not valid YAML/JSON
    #[error("Could not parse config file: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("Could not read config file: {0}")]
    Io(String),

    /// `authorization` section missing
    #[error("Authorization parameters are missing, contact support please.")]
    MissingAuthorization,

    /// `authorization` section malformed or token payload incomplete
    #[error("Authorization parameters error, contact support please.")]
    InvalidAuthorization,

    /// `parameters` section missing
    #[error("Missing parameters configuration.")]
    MissingParameters,

    /// `action` names no supported action
    #[error("Action '{0}' does not exist.")]
    UnknownAction(String),

    /// Parameter validation failure
    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    /// Whether the error is caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ConfigError::Parse(_) | ConfigError::Io(_))
    }
}

/// Format of the exported shards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma separated values
    #[default]
    #[serde(alias = "CSV")]
    Csv,
    /// Newline delimited JSON
    #[serde(alias = "JSON")]
    Json,
}

impl ExportFormat {
    /// File extension used for exported shards (before `.gz`)
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// `destinationFormat` value of an export job
    pub fn destination_format(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "NEWLINE_DELIMITED_JSON",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn default_true() -> bool {
    true
}

/// One configured extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    /// Query name, unique within a configuration
    #[serde(default)]
    pub name: String,
    /// SQL text
    #[serde(default)]
    pub query: String,
    /// Explicit destination table id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_table: Option<String>,
    /// Flatten nested and repeated fields
    #[serde(default = "default_true")]
    pub flatten_results: bool,
    /// Load the destination table incrementally
    #[serde(default)]
    pub incremental: bool,
    /// Destination primary key columns
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Disabled queries are skipped
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Run the query with legacy SQL
    #[serde(default = "default_true")]
    pub use_legacy_sql: bool,
    /// Optional numeric id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Export file format
    #[serde(default)]
    pub format: ExportFormat,
}

impl QueryConfig {
    /// Create a query with default options
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            output_table: None,
            flatten_results: true,
            incremental: false,
            primary_key: Vec::new(),
            enabled: true,
            use_legacy_sql: true,
            id: None,
            format: ExportFormat::Csv,
        }
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let path = format!("parameters.queries.{index}");
        require_non_empty(&path, "name", Some(&self.name))?;
        require_non_empty(&path, "query", Some(&self.query))?;
        Ok(())
    }
}

/// `parameters.google` as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleParams {
    /// Billing project id
    #[serde(default)]
    pub project_id: Option<String>,
    /// `gs://bucket/path` export location
    #[serde(default)]
    pub storage: Option<String>,
    /// Region scoping the cache dataset
    #[serde(default)]
    pub location: Option<String>,
}

impl GoogleParams {
    fn field(&self, field: GoogleField) -> Option<&str> {
        match field {
            GoogleField::ProjectId => self.project_id.as_deref(),
            GoogleField::Storage => self.storage.as_deref(),
        }
    }
}

/// Project-level settings needed to run extractions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    /// Billing project id
    pub project_id: String,
    /// `gs://bucket/path` export location
    pub storage: String,
    /// Region scoping the cache dataset
    pub location: String,
}

/// OAuth credentials decoded from the authorization section
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// Current access token
    pub access_token: String,
    /// Token used to obtain new access tokens
    pub refresh_token: String,
    /// OAuth client id
    pub app_key: String,
    /// OAuth client secret
    pub app_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Validated extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Requested action
    pub action: Action,
    /// OAuth credentials
    pub credentials: OAuthCredentials,
    /// `parameters.google`, validated for `action`
    pub google: GoogleParams,
    /// Configured queries
    pub queries: Vec<QueryConfig>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    authorization: Option<serde_yaml::Value>,
    #[serde(default)]
    parameters: Option<serde_yaml::Value>,
}

#[derive(Deserialize)]
struct RawAuthorization {
    oauth_api: RawOAuthApi,
}

#[derive(Deserialize)]
struct RawOAuthApi {
    credentials: RawCredentials,
}

#[derive(Deserialize)]
struct RawCredentials {
    #[serde(rename = "#data")]
    data: String,
    #[serde(rename = "appKey")]
    app_key: String,
    #[serde(rename = "#appSecret")]
    app_secret: String,
}

#[derive(Deserialize)]
struct TokenData {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct RawParameters {
    #[serde(default)]
    google: Option<GoogleParams>,
    #[serde(default)]
    queries: Vec<QueryConfig>,
}

impl ExtractorConfig {
    /// Load the configuration file from `data_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingConfigFile`] when neither `config.yml`
    /// nor `config.json` exists, or any validation error of the content.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = CONFIG_FILE_NAMES
            .iter()
            .map(|name| data_dir.join(name))
            .find(|path| path.is_file())
            .ok_or(ConfigError::MissingConfigFile)?;

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration text (YAML or JSON)
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: Option<RawConfig> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let raw = raw.ok_or_else(|| ConfigError::Parse("configuration is empty".to_string()))?;

        let action = match raw.action.as_deref() {
            Some(name) => Action::from_str(name)?,
            None => Action::default(),
        };

        let authorization = raw.authorization.ok_or(ConfigError::MissingAuthorization)?;
        let parameters = raw.parameters.ok_or(ConfigError::MissingParameters)?;

        let credentials = parse_credentials(authorization)?;
        let (google, queries) = parse_parameters(parameters, action)?;

        Ok(Self {
            action,
            credentials,
            google,
            queries,
        })
    }

    /// Billing project id
    pub fn project_id(&self) -> Result<&str, ConfigError> {
        self.google
            .project_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| missing_child("parameters.google", GoogleField::ProjectId.key()))
    }

    /// Full project context, available once `projectId` and `storage` are configured
    pub fn project_context(&self) -> Result<ProjectContext, ConfigError> {
        let project_id = self.project_id()?.to_string();
        let storage = self
            .google
            .storage
            .as_deref()
            .filter(|storage| !storage.trim().is_empty())
            .ok_or_else(|| missing_child("parameters.google", GoogleField::Storage.key()))?
            .to_string();
        let location = self
            .google
            .location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .unwrap_or(DEFAULT_LOCATION)
            .to_string();

        Ok(ProjectContext {
            project_id,
            storage,
            location,
        })
    }
}

fn parse_credentials(value: serde_yaml::Value) -> Result<OAuthCredentials, ConfigError> {
    let raw: RawAuthorization = serde_yaml::from_value(value).map_err(|e| {
        error!("{}", e);
        ConfigError::InvalidAuthorization
    })?;
    let credentials = raw.oauth_api.credentials;

    if credentials.data.trim().is_empty()
        || credentials.app_key.trim().is_empty()
        || credentials.app_secret.trim().is_empty()
    {
        error!("Authorization credentials cannot contain empty values");
        return Err(ConfigError::InvalidAuthorization);
    }

    let token: TokenData = serde_json::from_str(&credentials.data).map_err(|e| {
        error!("Missing access or refresh token data: {}", e);
        ConfigError::InvalidAuthorization
    })?;

    Ok(OAuthCredentials {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        app_key: credentials.app_key,
        app_secret: credentials.app_secret,
    })
}

fn parse_parameters(
    value: serde_yaml::Value,
    action: Action,
) -> Result<(GoogleParams, Vec<QueryConfig>), ConfigError> {
    let raw: RawParameters = serde_yaml::from_value(value)
        .map_err(|e| ConfigError::Invalid(format!("Invalid configuration for path \"parameters\": {e}")))?;

    let required = action.required_google_fields();
    let google = match raw.google {
        Some(google) => google,
        None if required.is_empty() => GoogleParams::default(),
        None => return Err(missing_child("parameters", "google")),
    };

    for field in required {
        require_non_empty("parameters.google", field.key(), google.field(*field))?;
    }

    for (index, query) in raw.queries.iter().enumerate() {
        query.validate(index)?;
    }

    Ok((google, raw.queries))
}

fn require_non_empty(path: &str, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        None => Err(missing_child(path, key)),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Invalid(format!(
            "The path \"{path}.{key}\" cannot contain an empty value, but got \"{value}\"."
        ))),
        Some(_) => Ok(()),
    }
}

fn missing_child(path: &str, key: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "The child node \"{key}\" at path \"{path}\" must be configured."
    ))
}
