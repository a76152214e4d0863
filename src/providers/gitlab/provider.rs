use crate::error::Result;
use crate::lifecycle::api::PipelineApi;
use crate::lifecycle::env::TriggerRequest;
use crate::providers::gitlab::client::GitLabProject;

use super::links::curl_hint;
use super::types::{Job, JobId, Pipeline, PipelineId};

impl PipelineApi for GitLabProject {
    fn project_id(&self) -> &str {
        GitLabProject::project_id(self)
    }

    fn has_credential(&self) -> bool {
        self.gitlab().has_token()
    }

    fn status_query_hint(&self, pipeline_id: PipelineId) -> String {
        match self.url(&["pipelines", &pipeline_id.to_string()]) {
            Ok(url) => curl_hint(&url),
            Err(_) => format!("pipeline {pipeline_id} of project {}", self.project_id()),
        }
    }

    async fn create_pipeline(&self, request: &TriggerRequest) -> Result<PipelineId> {
        GitLabProject::create_pipeline(self, request).await
    }

    async fn pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline> {
        GitLabProject::pipeline(self, pipeline_id).await
    }

    async fn latest_pipeline(&self, ref_: &str) -> Result<Option<Pipeline>> {
        GitLabProject::latest_pipeline(self, ref_).await
    }

    async fn ref_tip(&self, ref_: &str) -> Result<String> {
        GitLabProject::ref_tip(self, ref_).await
    }

    async fn retry_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        GitLabProject::retry_pipeline(self, pipeline_id).await
    }

    async fn web_url(&self) -> Result<String> {
        GitLabProject::web_url(self).await
    }

    async fn jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>> {
        GitLabProject::jobs(self, pipeline_id).await
    }

    async fn play_job(&self, job_id: JobId) -> Result<()> {
        GitLabProject::play_job(self, job_id).await
    }

    async fn job_trace(&self, job_id: JobId) -> Result<String> {
        GitLabProject::job_trace(self, job_id).await
    }
}
