//! Asynchronous remote jobs
//!
//! A [`Job`] wraps one BigQuery job: it is built locally (creating the cache
//! dataset for query jobs), submitted once, then polled with exponential
//! backoff until the remote state leaves `PENDING`/`RUNNING`. Job-level
//! errors are checked on the submission response and on every poll.

mod payload;
mod state;

pub use payload::{
    ExtractJobConfig, JobConfiguration, JobRequest, QueryJobConfig, TableReference,
    EXPORT_COMPRESSION, WRITE_DISPOSITION,
};
pub use state::{JobKind, JobState};

use crate::api::{envelope, ApiClient, ApiError, HttpRequest, HttpResponse};
use crate::config::{ProjectContext, QueryConfig};
use crate::context::RunContext;
use crate::identifier::{self, IdentifierError};
use serde_json::Value;
use tracing::{debug, info};

/// Description given to a newly created cache dataset
pub const CACHE_DATASET_DESCRIPTION: &str = "Google BigQuery Extractor cache";

/// Job errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Identifier could not be derived
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Job reported an error in its status
    #[error("{0}")]
    Failed(String),

    /// Job body carries no usable `jobReference`
    #[error("Job response is missing jobReference.projectId or jobReference.jobId")]
    MissingJobReference,

    /// Job payload could not be encoded
    #[error("Could not encode job payload: {0}")]
    Payload(String),
}

impl JobError {
    /// Whether the message is meant for the end user
    pub fn is_user_error(&self) -> bool {
        match self {
            JobError::Failed(_) => true,
            JobError::Api(err) => err.is_user_error(),
            _ => false,
        }
    }
}

/// One remote job
#[derive(Debug, Clone)]
pub struct Job {
    kind: JobKind,
    query_name: String,
    project_id: String,
    request: JobRequest,
    state: JobState,
    job_url: Option<String>,
}

impl Job {
    /// Build the job for `query`.
    ///
    /// Query jobs first make sure the regional cache dataset exists.
    pub async fn build(
        kind: JobKind,
        client: &ApiClient,
        ctx: &RunContext,
        query: &QueryConfig,
        project: &ProjectContext,
    ) -> Result<Self, JobError> {
        let cache_table = TableReference {
            project_id: project.project_id.clone(),
            dataset_id: identifier::cache_dataset_id(&project.location),
            table_id: identifier::table_name(&ctx.account, query),
        };

        let configuration = match kind {
            JobKind::Query => {
                ensure_cache_dataset(client, query, project, &cache_table.dataset_id).await?;
                JobConfiguration::Query(QueryJobConfig {
                    flatten_results: query.flatten_results,
                    use_legacy_sql: query.use_legacy_sql,
                    allow_large_results: true,
                    query: query.query.clone(),
                    destination_table: cache_table,
                    use_query_cache: true,
                    write_disposition: WRITE_DISPOSITION.to_string(),
                })
            }
            JobKind::Export => JobConfiguration::Extract(ExtractJobConfig {
                compression: EXPORT_COMPRESSION.to_string(),
                destination_format: query.format.destination_format().to_string(),
                source_table: cache_table,
                print_header: false,
                destination_uris: vec![identifier::export_path(ctx, query, project)],
            }),
        };

        Ok(Self {
            kind,
            query_name: query.name.clone(),
            project_id: project.project_id.clone(),
            request: JobRequest { configuration },
            state: JobState::Created,
            job_url: None,
        })
    }

    /// Job kind
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Request payload
    pub fn request(&self) -> &JobRequest {
        &self.request
    }

    /// Name of the query the job belongs to
    pub fn query_name(&self) -> &str {
        &self.query_name
    }

    /// Canonical job URL, known once submitted
    pub fn job_url(&self) -> Option<&str> {
        self.job_url.as_deref()
    }

    /// Submit the job and poll it to completion.
    ///
    /// Returns the final job body. There is no overall deadline: a job that
    /// stays `RUNNING` is polled every 20 seconds indefinitely.
    pub async fn execute(&mut self, client: &ApiClient) -> Result<Value, JobError> {
        info!("{}: {}", self.query_name, self.kind.start_message());

        let payload =
            serde_json::to_value(&self.request).map_err(|e| JobError::Payload(e.to_string()))?;
        let url = client.jobs_url(&self.project_id)?;

        let response = client
            .request(&HttpRequest::post_json(url, payload))
            .await
            .map_err(|e| self.fail(e.into()))?;
        let mut body = self.accept(response)?;
        self.state = JobState::Submitted;

        let mut attempt = 0;
        loop {
            let url = self.track(client, &body)?;
            self.state = JobState::from_body(&body);
            if !self.state.is_active() {
                break;
            }

            tokio::time::sleep(client.backoff().delay(attempt)).await;
            attempt += 1;

            let response = client
                .request(&HttpRequest::get(url))
                .await
                .map_err(|e| self.fail(e.into()))?;
            body = self.accept(response)?;
            debug!("{}: Polling {} job (poll {})", self.query_name, self.kind, attempt);
        }

        info!("{}: {}", self.query_name, self.kind.finish_message());
        Ok(body)
    }

    /// Validate a submission or poll response and return its body
    fn accept(&mut self, response: HttpResponse) -> Result<Value, JobError> {
        if !response.is_success() {
            let embedded = response
                .json_body::<Value>()
                .ok()
                .and_then(|body| envelope::job_status_error(&body));
            let err = match embedded {
                Some(message) => JobError::Failed(message),
                None => envelope::classify(response.status, &response.body).into(),
            };
            return Err(self.fail(err));
        }

        let body: Value = response.json_body().map_err(|e| {
            self.fail(
                ApiError::InvalidResponse(format!("Failed to deserialize job response: {e}"))
                    .into(),
            )
        })?;

        if let Some(message) = envelope::job_status_error(&body) {
            return Err(self.fail(JobError::Failed(message)));
        }
        Ok(body)
    }

    /// Derive and remember the canonical job URL from `jobReference`
    fn track(&mut self, client: &ApiClient, body: &Value) -> Result<String, JobError> {
        let url = job_url(client, body).map_err(|e| self.fail(e))?;
        self.job_url = Some(url.clone());
        Ok(url)
    }

    fn fail(&mut self, err: JobError) -> JobError {
        self.state = JobState::Failed;
        err
    }
}

/// `<bigquery>/projects/<projectId>/jobs/<jobId>?<other reference fields>`
pub fn job_url(client: &ApiClient, body: &Value) -> Result<String, JobError> {
    let reference = body
        .get("jobReference")
        .and_then(Value::as_object)
        .ok_or(JobError::MissingJobReference)?;

    let field = |key: &str| {
        reference
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };
    let (project_id, job_id) = match (field("projectId"), field("jobId")) {
        (Some(project_id), Some(job_id)) => (project_id, job_id),
        _ => return Err(JobError::MissingJobReference),
    };

    let mut url = url::Url::parse(&client.bigquery_url(&["projects", project_id, "jobs", job_id])?)
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in reference {
            if key == "projectId" || key == "jobId" {
                continue;
            }
            match value {
                Value::String(text) => query.append_pair(key, text),
                Value::Null => continue,
                other => query.append_pair(key, &other.to_string()),
            };
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url.into())
}

async fn ensure_cache_dataset(
    client: &ApiClient,
    query: &QueryConfig,
    project: &ProjectContext,
    dataset_id: &str,
) -> Result<(), JobError> {
    if client.dataset_exists(&project.project_id, dataset_id).await? {
        return Ok(());
    }

    info!("{}: Creating dataset \"{}\"", query.name, dataset_id);
    client
        .create_dataset(
            &project.project_id,
            dataset_id,
            Some(CACHE_DATASET_DESCRIPTION),
            Some(&project.location),
        )
        .await?;
    info!("{}: Dataset \"{}\" created", query.name, dataset_id);
    Ok(())
}
