//! Unit tests for identifier generation through the public API

use bigquery_extractor::config::{ExportFormat, ProjectContext, QueryConfig};
use bigquery_extractor::identifier::{
    cache_dataset_id, export_mask, export_path, output_table_id, sanitize, storage_bucket,
    table_name, IdentifierError,
};
use bigquery_extractor::RunContext;

fn project(storage: &str) -> ProjectContext {
    ProjectContext {
        project_id: "billing".to_string(),
        storage: storage.to_string(),
        location: "US".to_string(),
    }
}

#[test]
fn test_export_names_are_deterministic() {
    let ctx = RunContext::new("20240101000000000", "config 7", "/data");
    let query = QueryConfig::new("Daily - Orders", "SELECT 1");
    let project = project("gs://bucket/a/b");

    let first = (
        export_path(&ctx, &query, &project),
        export_mask(&ctx, &query, &project).unwrap(),
    );
    let second = (
        export_path(&ctx, &query, &project),
        export_mask(&ctx, &query, &project).unwrap(),
    );
    assert_eq!(first, second);
    assert_eq!(
        first.0,
        "gs://bucket/a/b/runId-20240101000000000/config_7/Daily_Orders_*.csv.gz"
    );
    assert_eq!(first.1, "a/b/runId-20240101000000000/config_7/Daily_Orders_");
}

#[test]
fn test_mask_is_prefix_of_exported_objects() {
    let ctx = RunContext::new("5", "acc", "/data");
    let mut query = QueryConfig::new("events", "SELECT 1");
    query.format = ExportFormat::Json;
    let project = project("gs://bucket/exports");

    let path = export_path(&ctx, &query, &project);
    let object_name = path
        .trim_start_matches("gs://bucket/")
        .replace('*', "000000000003");
    let mask = export_mask(&ctx, &query, &project).unwrap();

    assert!(object_name.starts_with(&mask));
    assert!(object_name.ends_with(".json.gz"));
}

#[test]
fn test_non_gcs_storage_is_rejected() {
    let ctx = RunContext::new("5", "acc", "/data");
    let query = QueryConfig::new("q", "SELECT 1");

    let err = export_mask(&ctx, &query, &project("s3://bucket/path")).unwrap_err();
    assert!(matches!(err, IdentifierError::InvalidStoragePath(_)));
    assert!(storage_bucket(&project("bucket/path")).is_err());
}

#[test]
fn test_names_use_safe_alphabet() {
    let query = QueryConfig::new("Ünïcode & spaces -- here", "SELECT 1");
    let name = table_name("acc #1", &query);
    assert!(name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_'));
    assert_eq!(sanitize(&name), name);
}

#[test]
fn test_cache_dataset_and_output_table() {
    assert_eq!(cache_dataset_id("asia-northeast1"), "kbc_extractor_asia_northeast1");

    let query = QueryConfig::new("orders", "SELECT 1");
    assert_eq!(
        output_table_id("acc", &query),
        "in.c-ex-google-bigquery-acc.orders"
    );
}
