//! API client with retry/backoff and resource verbs
//!
//! Features:
//! - Retry with exponential backoff on transport failures, 5xx and 429
//! - Classified errors for every other non-success response
//! - Paginated listings with a safety cap
//! - Dataset, table, object, bucket and project verbs

use super::config::{
    BackoffPolicy, BIGQUERY_ENDPOINT, MAX_PAGES, OBJECT_LIST_FIELDS, PAGE_SIZE, STORAGE_ENDPOINT,
    TOKEN_ENDPOINT,
};
use super::envelope;
use super::resources::{
    BucketInfo, CloudFile, Dataset, Page, ProjectInfo, RawBucket, RawProject, RawTable,
    TableColumn,
};
use super::retry::{format_retry, RetryReason};
use super::transport::{HttpRequest, HttpResponse, Transport};
use super::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Kind of storage listing entries that are buckets
const BUCKET_KIND: &str = "storage#bucket";

/// Base URLs of the services the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// BigQuery REST base, e.g. `https://www.googleapis.com/bigquery/v2`
    pub bigquery: String,
    /// Cloud Storage JSON API base
    pub storage: String,
    /// OAuth token endpoint
    pub token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            bigquery: BIGQUERY_ENDPOINT.to_string(),
            storage: STORAGE_ENDPOINT.to_string(),
            token: TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at `base`, using the public path layout
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            bigquery: format!("{base}/bigquery/v2"),
            storage: format!("{base}/storage/v1"),
            token: format!("{base}/oauth2/v4/token"),
        }
    }
}

/// BigQuery and Cloud Storage client
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    backoff: BackoffPolicy,
}

impl ApiClient {
    /// Create a client with default endpoints and backoff
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoints: Endpoints::default(),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Override service endpoints
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Override the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Service endpoints
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Backoff policy, shared with job polling
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns the first response that is neither `5xx` nor `429`, whatever
    /// its status. Once `max_attempts` is exhausted the last failure is
    /// returned as [`ApiError::Transport`] or [`ApiError::Server`].
    pub async fn request(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let max_attempts = self.backoff.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let (reason, failure) = match self.transport.send(request).await {
                Ok(response) => match RetryReason::from_status(response.status) {
                    None => {
                        debug!(
                            "{} {} -> {} (attempt {})",
                            request.method, request.url, response.status, attempt
                        );
                        return Ok(response);
                    }
                    Some(reason) => (
                        reason,
                        ApiError::Server {
                            status: response.status,
                            body: response.text(),
                        },
                    ),
                },
                Err(err) => match RetryReason::from_transport(&err) {
                    None => return Err(err.into()),
                    Some(reason) => (reason, ApiError::Transport(err)),
                },
            };

            if attempt >= max_attempts {
                warn!(
                    "Giving up on {} {} after {} attempts: {}",
                    request.method, request.url, attempt, failure
                );
                return Err(failure);
            }

            let backoff = self.backoff.delay(attempt - 1);
            warn!(
                "{}",
                format_retry(attempt, max_attempts, reason, backoff, &request.url)
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// Send `request` and classify any non-success response
    pub async fn send_checked(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        let response = self.request(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(envelope::classify(response.status, &response.body))
        }
    }

    /// Send `request` and decode the success body
    pub async fn get_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> ApiResult<T> {
        let response = self.send_checked(request).await?;
        response.json_body().map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to deserialize response: {e}"))
        })
    }

    /// BigQuery URL built from percent-encoded path segments
    pub fn bigquery_url(&self, segments: &[&str]) -> ApiResult<String> {
        join_segments(&self.endpoints.bigquery, segments)
    }

    /// Cloud Storage URL built from percent-encoded path segments
    pub fn storage_url(&self, segments: &[&str]) -> ApiResult<String> {
        join_segments(&self.endpoints.storage, segments)
    }

    /// Job collection of `project_id`
    pub fn jobs_url(&self, project_id: &str) -> ApiResult<String> {
        self.bigquery_url(&["projects", project_id, "jobs"])
    }

    /// Whether the dataset exists; `404` is `false`
    pub async fn dataset_exists(&self, project_id: &str, dataset_id: &str) -> ApiResult<bool> {
        let url = self.bigquery_url(&["projects", project_id, "datasets", dataset_id])?;
        let response = self.request(&HttpRequest::get(url)).await?;

        match response.status {
            404 => Ok(false),
            _ if response.is_success() => Ok(true),
            status => Err(envelope::classify(status, &response.body)),
        }
    }

    /// Create a dataset; succeeds only on `200` with a `selfLink`
    pub async fn create_dataset(
        &self,
        project_id: &str,
        dataset_id: &str,
        description: Option<&str>,
        location: Option<&str>,
    ) -> ApiResult<Dataset> {
        let url = self.bigquery_url(&["projects", project_id, "datasets"])?;

        let mut body = json!({
            "datasetReference": {
                "projectId": project_id,
                "datasetId": dataset_id,
            }
        });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        if let Some(location) = location {
            body["location"] = json!(location);
        }

        let response = self.send_checked(&HttpRequest::post_json(url, body)).await?;
        if response.status != 200 {
            return Err(ApiError::InvalidResponse(format!(
                "Dataset {dataset_id} was not created, status {}",
                response.status
            )));
        }

        let dataset: Dataset = response
            .json_body()
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid dataset resource: {e}")))?;
        if dataset.self_link.is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "Dataset {dataset_id} was not created, missing selfLink"
            )));
        }
        Ok(dataset)
    }

    /// Delete a dataset; `true` iff the API answered `204`
    pub async fn delete_dataset(&self, project_id: &str, dataset_id: &str) -> ApiResult<bool> {
        let url = self.bigquery_url(&["projects", project_id, "datasets", dataset_id])?;
        let response = self.send_checked(&HttpRequest::delete(url)).await?;
        Ok(response.status == 204)
    }

    /// Schema columns of a table
    pub async fn list_table_columns(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
    ) -> ApiResult<Vec<TableColumn>> {
        let url = self.bigquery_url(&[
            "projects", project_id, "datasets", dataset_id, "tables", table_id,
        ])?;
        let table: RawTable = self.get_json(&HttpRequest::get(url)).await?;
        Ok(table.schema.map(|schema| schema.fields).unwrap_or_default())
    }

    /// Every object of `bucket` whose name starts with `prefix`
    pub async fn list_objects(&self, bucket: &str, prefix: &str) -> ApiResult<Vec<CloudFile>> {
        let url = self.storage_url(&["b", bucket, "o"])?;
        let request = HttpRequest::get(url)
            .with_query("fields", OBJECT_LIST_FIELDS)
            .with_query("prefix", prefix);
        self.list_pages(request).await
    }

    /// Stream an object to `destination`
    pub async fn download_object(&self, file: &CloudFile, destination: &Path) -> ApiResult<()> {
        let mut attempt = 0;
        let max_attempts = self.backoff.max_attempts.max(1);

        loop {
            attempt += 1;
            let result = self.transport.download(&file.media_link, destination).await;

            let (reason, failure) = match result {
                Ok(response) if response.is_success() => return Ok(()),
                Ok(response) => match RetryReason::from_status(response.status) {
                    None => return Err(envelope::classify(response.status, &response.body)),
                    Some(reason) => (
                        reason,
                        ApiError::Server {
                            status: response.status,
                            body: response.text(),
                        },
                    ),
                },
                Err(err) => match RetryReason::from_transport(&err) {
                    None => return Err(err.into()),
                    Some(reason) => (reason, ApiError::Transport(err)),
                },
            };

            if attempt >= max_attempts {
                return Err(failure);
            }
            let backoff = self.backoff.delay(attempt - 1);
            warn!(
                "{}",
                format_retry(attempt, max_attempts, reason, backoff, &file.media_link)
            );
            tokio::time::sleep(backoff).await;
        }
    }

    /// Delete an object; `true` iff the API answered `204`
    pub async fn delete_object(&self, file: &CloudFile) -> ApiResult<bool> {
        let url = self.storage_url(&["b", &file.bucket, "o", &file.name])?;
        let response = self.send_checked(&HttpRequest::delete(url)).await?;
        Ok(response.status == 204)
    }

    /// Buckets of `project_id`
    pub async fn list_buckets(&self, project_id: &str) -> ApiResult<Vec<BucketInfo>> {
        let url = self.storage_url(&["b"])?;
        let request = HttpRequest::get(url).with_query("project", project_id);
        let buckets: Vec<RawBucket> = self.list_pages(request).await?;

        buckets
            .into_iter()
            .filter(|bucket| bucket.kind.as_deref() == Some(BUCKET_KIND))
            .map(|bucket| match (bucket.id, bucket.name) {
                (Some(id), Some(name)) => Ok(BucketInfo { id, name }),
                _ => Err(ApiError::InvalidResponse(
                    "Bucket entry is missing id or name".to_string(),
                )),
            })
            .collect()
    }

    /// Projects visible to the authorized account
    pub async fn list_projects(&self) -> ApiResult<Vec<ProjectInfo>> {
        let url = self.bigquery_url(&["projects"])?;
        let projects: Vec<RawProject> = self.list_pages(HttpRequest::get(url)).await?;
        Ok(projects.into_iter().map(ProjectInfo::from).collect())
    }

    async fn list_pages<T: DeserializeOwned>(&self, request: HttpRequest) -> ApiResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0;

        loop {
            if page >= MAX_PAGES {
                return Err(ApiError::InvalidResponse(format!(
                    "Max pages ({MAX_PAGES}) exceeded for {} - possible infinite loop",
                    request.url
                )));
            }
            page += 1;

            let mut page_request = request
                .clone()
                .with_query("maxResults", PAGE_SIZE.to_string());
            if let Some(token) = page_token.take() {
                page_request = page_request.with_query("pageToken", token);
            }

            let body: Page<T> = self.get_json(&page_request).await?;
            debug!("Fetched page {} of {} ({} items)", page, request.url, body.items.len());
            items.extend(body.items);

            match body.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

fn join_segments(base: &str, segments: &[&str]) -> ApiResult<String> {
    let mut url = Url::parse(base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}
