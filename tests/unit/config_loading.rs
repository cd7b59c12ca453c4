//! Unit tests for loading configuration files from the data directory

use bigquery_extractor::config::{Action, ConfigError, ExtractorConfig};
use std::fs;

const YAML: &str = r##"
action: listBuckets
authorization:
  oauth_api:
    credentials:
      "#data": '{"access_token": "yaml-token", "refresh_token": "r"}'
      appKey: key
      "#appSecret": secret
parameters:
  google:
    projectId: from-yaml
"##;

fn json_config(project_id: &str) -> String {
    serde_json::json!({
        "action": "listBuckets",
        "authorization": {"oauth_api": {"credentials": {
            "#data": "{\"access_token\": \"json-token\", \"refresh_token\": \"r\"}",
            "appKey": "key",
            "#appSecret": "secret"
        }}},
        "parameters": {"google": {"projectId": project_id}}
    })
    .to_string()
}

#[test]
fn test_yaml_preferred_over_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), YAML).unwrap();
    fs::write(dir.path().join("config.json"), json_config("from-json")).unwrap();

    let config = ExtractorConfig::load(dir.path()).unwrap();
    assert_eq!(config.action, Action::ListBuckets);
    assert_eq!(config.project_id().unwrap(), "from-yaml");
    assert_eq!(config.credentials.access_token, "yaml-token");
}

#[test]
fn test_json_fallback() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), json_config("from-json")).unwrap();

    let config = ExtractorConfig::load(dir.path()).unwrap();
    assert_eq!(config.project_id().unwrap(), "from-json");
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExtractorConfig::load(dir.path()).unwrap_err();
    assert_eq!(err.to_string(), "Missing configuration file.");
    assert!(err.is_user_error());
}

#[test]
fn test_unparseable_file_is_not_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yml"), "action: [unterminated").unwrap();

    let err = ExtractorConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(!err.is_user_error());
}
