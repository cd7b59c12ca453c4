//! Resource representations returned by the BigQuery and Cloud Storage APIs

use serde::{Deserialize, Serialize};

/// Storage object produced by an export job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFile {
    /// Bucket holding the object
    pub bucket: String,
    /// Object name (path inside the bucket)
    pub name: String,
    /// Direct download URL
    #[serde(default)]
    pub media_link: String,
    /// Object id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CloudFile {
    /// Last path segment of the object name
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name
    pub name: String,
    /// BigQuery type, e.g. `STRING`
    #[serde(rename = "type")]
    pub column_type: String,
}

/// Bucket entry of the `listBuckets` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket id
    pub id: String,
    /// Bucket name
    pub name: String,
}

/// Project entry of the `listProjects` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project id
    pub id: String,
    /// Friendly name, or the id when the project has none
    pub name: String,
}

/// Dataset resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Fully qualified id, `project:dataset`
    #[serde(default)]
    pub id: Option<String>,
    /// Canonical resource URL
    #[serde(default)]
    pub self_link: String,
    /// Location the dataset lives in
    #[serde(default)]
    pub location: Option<String>,
}

/// One page of a listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new", alias = "projects")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBucket {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProject {
    pub id: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl From<RawProject> for ProjectInfo {
    fn from(raw: RawProject) -> Self {
        let name = raw
            .friendly_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| raw.id.clone());
        Self { id: raw.id, name }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTable {
    #[serde(default)]
    pub schema: Option<RawSchema>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSchema {
    #[serde(default)]
    pub fields: Vec<TableColumn>,
}
