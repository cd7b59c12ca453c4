//! Extraction orchestration
//!
//! [`Extractor::execute`] dispatches the configured [`Action`]. The `run`
//! action processes queries strictly one after another; for each enabled
//! query it:
//!
//! 1. runs the query job into the regional cache table
//! 2. exports the cache table to Cloud Storage
//! 3. downloads every exported shard into `out/tables`
//! 4. writes the manifest
//! 5. deletes the exported shards from Cloud Storage

use crate::api::{ApiClient, BucketInfo, CloudFile, ProjectInfo};
use crate::config::{Action, ExtractorConfig, ProjectContext, QueryConfig};
use crate::context::RunContext;
use crate::error::{ExtractorError, ExtractorResult};
use crate::identifier;
use crate::job::{Job, JobKind};
use crate::output::{Manifest, OutputLayout};
use serde::Serialize;
use tracing::{error, info};

/// User error raised when a shard could not be deleted
pub const CLEANUP_FAILED: &str = "Cloud Storage file was not removed";

/// `status` of a successful list action
pub const STATUS_SUCCESS: &str = "success";

/// Response of the list actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    /// Always `success`
    pub status: String,
    /// Listed resources
    #[serde(flatten)]
    pub payload: ActionPayload,
}

/// Resources returned by a list action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPayload {
    /// `listProjects`
    Projects(Vec<ProjectInfo>),
    /// `listBuckets`
    Buckets(Vec<BucketInfo>),
}

impl ActionResponse {
    fn success(payload: ActionPayload) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            payload,
        }
    }
}

/// Runs the configured action against the Google APIs
pub struct Extractor {
    client: ApiClient,
    context: RunContext,
}

impl Extractor {
    /// Create an extractor
    pub fn new(client: ApiClient, context: RunContext) -> Self {
        Self { client, context }
    }

    /// Run context
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Dispatch the configured action.
    ///
    /// List actions return their response; `run` returns `None`.
    pub async fn execute(
        &self,
        config: &ExtractorConfig,
    ) -> ExtractorResult<Option<ActionResponse>> {
        match config.action {
            Action::Run => {
                self.run(config).await?;
                Ok(None)
            }
            Action::ListProjects => self.list_projects().await.map(Some),
            Action::ListBuckets => self.list_buckets(config).await.map(Some),
        }
    }

    /// Extract every enabled query
    pub async fn run(&self, config: &ExtractorConfig) -> ExtractorResult<()> {
        let project = config.project_context()?;
        let layout = OutputLayout::for_run(&self.context);

        for query in &config.queries {
            if !query.enabled {
                info!("{}: Skipped", query.name);
                continue;
            }
            self.extract(query, &project, &layout).await?;
        }
        Ok(())
    }

    /// Projects visible to the authorized account
    pub async fn list_projects(&self) -> ExtractorResult<ActionResponse> {
        let projects = self.client.list_projects().await?;
        Ok(ActionResponse::success(ActionPayload::Projects(projects)))
    }

    /// Buckets of the configured project
    pub async fn list_buckets(&self, config: &ExtractorConfig) -> ExtractorResult<ActionResponse> {
        let buckets = self.client.list_buckets(config.project_id()?).await?;
        Ok(ActionResponse::success(ActionPayload::Buckets(buckets)))
    }

    async fn extract(
        &self,
        query: &QueryConfig,
        project: &ProjectContext,
        layout: &OutputLayout,
    ) -> ExtractorResult<()> {
        let mut job = Job::build(JobKind::Query, &self.client, &self.context, query, project).await?;
        job.execute(&self.client).await?;

        let mut job =
            Job::build(JobKind::Export, &self.client, &self.context, query, project).await?;
        job.execute(&self.client).await?;

        let bucket = identifier::storage_bucket(project)?;
        let mask = identifier::export_mask(&self.context, query, project)?;
        let files = self.client.list_objects(&bucket, &mask).await?;
        info!("{}: Starting download of {} files", query.name, files.len());

        let output_table = identifier::output_table_id(&self.context.account, query);
        let output = layout.table(&output_table, query.format)?;
        output.ensure_directories()?;

        for file in &files {
            let destination = output.shard_path(file)?;
            self.client.download_object(file, &destination).await?;
            info!("{}: {} downloaded", query.name, file.file_name());
        }

        let columns = self
            .client
            .list_table_columns(
                &project.project_id,
                &identifier::cache_dataset_id(&project.location),
                &identifier::table_name(&self.context.account, query),
            )
            .await?;
        Manifest::new(output_table, query, &columns).write(&output.manifest_path)?;
        info!("{}: Manifest created", query.name);

        self.cleanup(query, &files).await
    }

    async fn cleanup(&self, query: &QueryConfig, files: &[CloudFile]) -> ExtractorResult<()> {
        if files.is_empty() {
            info!("{}: No Cloud Storage cleanup needed", query.name);
            return Ok(());
        }

        info!(
            "{}: Cloud Storage cleanup start ({} files)",
            query.name,
            files.len()
        );
        for file in files {
            if self.client.delete_object(file).await? {
                info!("{}: File {} removed", query.name, file.file_name());
            } else {
                error!("{}: File {} was not removed", query.name, file.file_name());
                return Err(ExtractorError::User(CLEANUP_FAILED.to_string()));
            }
        }
        info!("{}: Cloud Storage cleanup finished", query.name);
        Ok(())
    }
}
