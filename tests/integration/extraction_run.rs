//! End-to-end `run` tests against an in-memory Google

use crate::common::{self, job_body, LogCapture, ScriptedTransport, BASE, BUCKET};
use bigquery_extractor::api::HttpResponse;
use bigquery_extractor::output::manifest::Manifest;
use bigquery_extractor::{Extractor, ExtractorConfig, ExtractorError, RunContext};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SHARDS_PER_EXPORT: usize = 2;
const TABLE_DIR: &str = "in.c-ex-google-bigquery-acc.Orders.csv.gz";

/// Objects currently stored in the fake bucket
type Bucket = Arc<Mutex<Vec<String>>>;

fn config(queries: Value) -> ExtractorConfig {
    let config = json!({
        "action": "run",
        "authorization": {"oauth_api": {"credentials": {
            "#data": "{\"access_token\": \"t\", \"refresh_token\": \"r\"}",
            "appKey": "key",
            "#appSecret": "secret"
        }}},
        "parameters": {
            "google": {"projectId": common::PROJECT_ID, "storage": format!("gs://{BUCKET}/exports/")},
            "queries": queries
        }
    });
    ExtractorConfig::from_yaml_str(&config.to_string()).unwrap()
}

fn orders() -> Value {
    json!([{"name": "Orders", "query": "SELECT * FROM orders", "primaryKey": ["id"], "incremental": true}])
}

/// Wire up datasets, jobs, object listing, download and delete
fn fake_google(transport: &ScriptedTransport, shards: usize) -> Bucket {
    let bucket: Bucket = Arc::default();

    transport.always(
        Method::GET,
        "/datasets/kbc_extractor_us",
        HttpResponse::json(200, &json!({"selfLink": "https://google.test/ds"})),
    );
    transport.always(
        Method::GET,
        "/datasets/kbc_extractor_us/tables/",
        HttpResponse::json(
            200,
            &json!({"schema": {"fields": [
                {"name": "id", "type": "INTEGER"},
                {"name": "amount", "type": "NUMERIC"}
            ]}}),
        ),
    );

    let objects = bucket.clone();
    transport.on_fn(Method::POST, "/jobs", move |request| {
        let uri = request
            .body
            .as_ref()
            .and_then(|body| body["configuration"]["extract"]["destinationUris"][0].as_str());
        if let Some(uri) = uri {
            let name = uri.trim_start_matches(&format!("gs://{BUCKET}/"));
            let mut objects = objects.lock().unwrap();
            for shard in 0..shards {
                objects.push(name.replace('*', &format!("{shard:012}")));
            }
        }
        Ok(HttpResponse::json(200, &job_body("DONE")))
    });

    let objects = bucket.clone();
    transport.on_fn(Method::GET, "/b/export-bucket/o", move |request| {
        let prefix = request.query_param("prefix").unwrap_or_default();
        let items: Vec<Value> = objects
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| {
                json!({"bucket": BUCKET, "name": name, "mediaLink": format!("{BASE}/download/{name}")})
            })
            .collect();
        Ok(HttpResponse::json(200, &json!({"items": items})))
    });

    transport.on_fn(Method::GET, "/download/", |request| {
        let name = request.url.rsplit('/').next().unwrap_or_default();
        Ok(HttpResponse::new(200, format!("content of {name}")))
    });

    let objects = bucket.clone();
    transport.on_fn(Method::DELETE, "/b/export-bucket/o/", move |request| {
        let mut objects = objects.lock().unwrap();
        let position = objects
            .iter()
            .position(|name| request.url.ends_with(&name.replace('/', "%2F")));
        match position {
            Some(index) => {
                objects.remove(index);
                Ok(HttpResponse::new(204, ""))
            }
            None => Ok(HttpResponse::json(404, &common::error_body("notFound", "No such object"))),
        }
    });

    bucket
}

fn read_dir_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_run_downloads_manifests_and_cleans_up() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    let bucket = fake_google(&transport, SHARDS_PER_EXPORT);

    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    let response = extractor.execute(&config(orders())).await.unwrap();
    assert!(response.is_none());

    let tables = data.path().join("out").join("tables");
    assert_eq!(
        read_dir_names(&tables),
        vec![TABLE_DIR.to_string(), format!("{TABLE_DIR}.manifest")]
    );
    assert_eq!(
        read_dir_names(&tables.join(TABLE_DIR)),
        vec!["Orders_000000000000.csv.gz", "Orders_000000000001.csv.gz"]
    );
    let shard = std::fs::read_to_string(tables.join(TABLE_DIR).join("Orders_000000000001.csv.gz"))
        .unwrap();
    assert_eq!(shard, "content of Orders_000000000001.csv.gz");

    let manifest = Manifest::read(&tables.join(format!("{TABLE_DIR}.manifest"))).unwrap();
    assert_eq!(manifest.destination, "in.c-ex-google-bigquery-acc.Orders");
    assert_eq!(manifest.primary_key, vec!["id"]);
    assert!(manifest.incremental);
    assert_eq!(manifest.columns, vec!["id", "amount"]);

    assert!(bucket.lock().unwrap().is_empty());
    let remaining = common::client(transport.clone())
        .list_objects(BUCKET, "exports/runId-77/acc/Orders_")
        .await
        .unwrap();
    assert!(remaining.is_empty());
    assert_eq!(transport.count(Method::POST, "/jobs"), 2);
    assert_eq!(transport.count(Method::DELETE, "/o/"), SHARDS_PER_EXPORT);
}

#[tokio::test]
async fn test_export_destination_is_scoped_to_run() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, 1);

    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    extractor.execute(&config(orders())).await.unwrap();

    let export = transport
        .calls()
        .into_iter()
        .filter_map(|call| call.body)
        .find(|body| body["configuration"].get("extract").is_some())
        .unwrap();
    assert_eq!(
        export["configuration"]["extract"]["destinationUris"],
        json!(["gs://export-bucket/exports/runId-77/acc/Orders_*.csv.gz"])
    );
    assert_eq!(export["configuration"]["extract"]["compression"], "GZIP");

    let listing = transport
        .calls()
        .into_iter()
        .find(|call| call.method == Method::GET && call.url.ends_with("/b/export-bucket/o"))
        .unwrap();
    assert_eq!(
        listing.query_param("prefix"),
        Some("exports/runId-77/acc/Orders_")
    );
}

#[tokio::test]
async fn test_disabled_query_is_skipped() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, SHARDS_PER_EXPORT);

    let (logs, _guard) = LogCapture::install();
    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    extractor
        .execute(&config(json!([{"name": "Orders", "query": "SELECT 1", "enabled": false}])))
        .await
        .unwrap();

    assert!(transport.calls().is_empty());
    assert_eq!(logs.lines_containing("Orders: Skipped").len(), 1);
    assert!(!data.path().join("out").join("tables").exists());
}

#[tokio::test]
async fn test_queries_run_in_order() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, 1);

    let (logs, _guard) = LogCapture::install();
    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    extractor
        .execute(&config(json!([
            {"name": "first", "query": "SELECT 1"},
            {"name": "second", "query": "SELECT 2", "format": "json"}
        ])))
        .await
        .unwrap();

    let contents = logs.contents();
    let first_done = contents.find("first: Cloud Storage cleanup finished").unwrap();
    let second_start = contents.find("second: Query start").unwrap();
    assert!(first_done < second_start);

    let tables = data.path().join("out").join("tables");
    assert!(tables.join("in.c-ex-google-bigquery-acc.first.csv.gz").is_dir());
    assert!(tables.join("in.c-ex-google-bigquery-acc.second.json.gz").is_dir());
}

#[tokio::test]
async fn test_failed_delete_is_user_error() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, SHARDS_PER_EXPORT);
    transport.on(Method::DELETE, "/b/export-bucket/o/", HttpResponse::new(200, "{}"));

    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    let err = extractor.execute(&config(orders())).await.unwrap_err();

    assert!(matches!(err, ExtractorError::User(_)));
    assert_eq!(err.to_string(), "Cloud Storage file was not removed");
    assert_eq!(err.exit_code(), 1);
    assert_eq!(transport.count(Method::DELETE, "/o/"), 1);
}

#[tokio::test]
async fn test_empty_export_needs_no_cleanup() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, 0);

    let (logs, _guard) = LogCapture::install();
    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    extractor.execute(&config(orders())).await.unwrap();

    assert_eq!(
        logs.lines_containing("Orders: No Cloud Storage cleanup needed").len(),
        1
    );
    assert_eq!(transport.count(Method::DELETE, "/o/"), 0);

    let tables = data.path().join("out").join("tables");
    assert!(read_dir_names(&tables.join(TABLE_DIR)).is_empty());
    assert!(tables.join(format!("{TABLE_DIR}.manifest")).is_file());
}

#[tokio::test]
async fn test_failed_query_stops_the_run() {
    let data = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    fake_google(&transport, 1);
    let mut failed = job_body("DONE");
    failed["status"]["errorResult"] = json!({"reason": "invalidQuery", "message": "Syntax error"});
    transport.on_json(Method::POST, "/jobs", 200, failed);

    let extractor = Extractor::new(
        common::client(transport.clone()),
        RunContext::new("77", "acc", data.path()),
    );
    let err = extractor
        .execute(&config(json!([
            {"name": "broken", "query": "SELEC"},
            {"name": "never", "query": "SELECT 1"}
        ])))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Google API Error: [INVALIDQUERY] Syntax error");
    assert_eq!(err.exit_code(), 1);
    assert_eq!(transport.count(Method::POST, "/jobs"), 1);
}
