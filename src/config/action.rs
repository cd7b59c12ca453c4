//! Supported actions and their validation policy

use super::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Action requested by the configuration's `action` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    /// Extract every enabled query
    #[default]
    Run,
    /// List projects visible to the authorized account
    ListProjects,
    /// List storage buckets of the configured project
    ListBuckets,
}

/// Field of `parameters.google` that an action may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoogleField {
    /// Billing project id
    ProjectId,
    /// `gs://bucket/path` export location
    Storage,
}

impl GoogleField {
    /// Key as written in the configuration file
    pub fn key(&self) -> &'static str {
        match self {
            GoogleField::ProjectId => "projectId",
            GoogleField::Storage => "storage",
        }
    }
}

impl Action {
    /// Every action, in dispatch order
    pub const ALL: [Action; 3] = [Action::Run, Action::ListProjects, Action::ListBuckets];

    /// Fields of `parameters.google` that must be present and non-empty
    pub fn required_google_fields(&self) -> &'static [GoogleField] {
        match self {
            Action::Run => &[GoogleField::ProjectId, GoogleField::Storage],
            Action::ListBuckets => &[GoogleField::ProjectId],
            Action::ListProjects => &[],
        }
    }

    /// Name as written in the configuration file
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::ListProjects => "listProjects",
            Action::ListBuckets => "listBuckets",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
    }
}
