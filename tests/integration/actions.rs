//! Integration tests for action dispatch through the CLI entry point

use bigquery_extractor::cli::Cli;
use bigquery_extractor::ExtractorError;
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTHORIZATION: &str = r##"
authorization:
  oauth_api:
    credentials:
      "#data": '{"access_token": "token-1", "refresh_token": "refresh-1"}'
      appKey: key
      "#appSecret": secret
"##;

fn write_config(dir: &Path, body: &str) {
    std::fs::write(dir.join("config.yml"), format!("{AUTHORIZATION}{body}")).unwrap();
}

fn cli(dir: &Path, server: &MockServer) -> Cli {
    Cli {
        data: Some(dir.to_path_buf()),
        run_id: Some("1".to_string()),
        config_id: "acc".to_string(),
        max_attempts: 1,
        api_base_url: Some(server.uri()),
    }
}

#[tokio::test]
async fn test_list_projects_without_storage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bigquery/v2/projects"))
        .and(query_param_is_missing("pageToken"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [{"id": "p1", "friendlyName": "First"}],
            "nextPageToken": "next"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bigquery/v2/projects"))
        .and(query_param("pageToken", "next"))
        .and(query_param("maxResults", "50"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"projects": [{"id": "p2"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "action: listProjects\nparameters: {}\n");

    let response = cli(dir.path(), &server).execute().await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"status": "success", "projects": [
            {"id": "p1", "name": "First"},
            {"id": "p2", "name": "p2"}
        ]})
    );
}

#[tokio::test]
async fn test_list_buckets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .and(query_param("project", "billing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "storage#buckets",
            "items": [{"kind": "storage#bucket", "id": "exports", "name": "exports"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "action: listBuckets\nparameters:\n  google:\n    projectId: billing\n",
    );

    let response = cli(dir.path(), &server).execute().await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"status": "success", "buckets": [{"id": "exports", "name": "exports"}]})
    );
}

#[tokio::test]
async fn test_run_requires_storage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "action: run\nparameters:\n  google:\n    projectId: billing\n",
    );

    let err = cli(dir.path(), &server).execute().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The child node \"storage\" at path \"parameters.google\" must be configured."
    );
    assert_eq!(err.exit_code(), 1);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_unknown_action_is_user_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "action: exportEverything\nparameters: {}\n");

    let err = cli(dir.path(), &server).execute().await.unwrap_err();
    assert_eq!(err.to_string(), "Action 'exportEverything' does not exist.");
    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_missing_config_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let err = cli(dir.path(), &server).execute().await.unwrap_err();
    assert_eq!(err.to_string(), "Missing configuration file.");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_access_denied_is_user_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {
            "code": 403,
            "message": "caller does not have storage.buckets.list access",
            "errors": [{
                "domain": "global",
                "reason": "forbidden",
                "message": "caller does not have storage.buckets.list access"
            }]
        }})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "action: listBuckets\nparameters:\n  google:\n    projectId: billing\n",
    );

    let err = cli(dir.path(), &server).execute().await.unwrap_err();
    assert!(matches!(err, ExtractorError::Api(_)));
    assert_eq!(
        err.to_string(),
        "Google API Error: [GLOBAL] [FORBIDDEN] caller does not have storage.buckets.list access"
    );
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_server_errors_are_application_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bigquery/v2/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "action: listProjects\nparameters: {}\n");

    let err = cli(dir.path(), &server).execute().await.unwrap_err();
    assert!(!err.is_user_error());
    assert_eq!(err.exit_code(), 2);
}
