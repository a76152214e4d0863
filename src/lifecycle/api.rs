use crate::error::Result;
use crate::lifecycle::env::TriggerRequest;
use crate::providers::gitlab::types::{Job, JobId, Pipeline, PipelineId};

/// Remote operations the pipeline lifecycle needs.
///
/// Implemented by [`crate::providers::gitlab::GitLabProject`]; tests substitute a
/// scripted in-memory implementation.
#[allow(async_fn_in_trait)]
pub trait PipelineApi {
    /// Project id as given on the command line, for messages.
    fn project_id(&self) -> &str;

    /// Whether an access token is available for queries and job control.
    fn has_credential(&self) -> bool;

    /// Command reproducing the status query of `pipeline_id`.
    fn status_query_hint(&self, pipeline_id: PipelineId) -> String;

    async fn create_pipeline(&self, request: &TriggerRequest) -> Result<PipelineId>;

    async fn pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline>;

    async fn latest_pipeline(&self, ref_: &str) -> Result<Option<Pipeline>>;

    async fn ref_tip(&self, ref_: &str) -> Result<String>;

    async fn retry_pipeline(&self, pipeline_id: PipelineId) -> Result<()>;

    async fn web_url(&self) -> Result<String>;

    async fn jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>>;

    async fn play_job(&self, job_id: JobId) -> Result<()>;

    async fn job_trace(&self, job_id: JobId) -> Result<String>;
}
