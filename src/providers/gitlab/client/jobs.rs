use log::{debug, info};

use super::core::{GitLabProject, PAGE_SIZE};
use crate::error::{Result, TriggerError};
use crate::providers::gitlab::types::{Job, JobId, PipelineId};

const NEXT_PAGE_HEADER: &str = "x-next-page";

impl GitLabProject {
    /// All jobs of a pipeline, in the order the API lists them.
    pub async fn jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>> {
        let mut all_jobs = Vec::new();
        let mut page = "1".to_string();

        loop {
            let mut url = self.url(&["pipelines", &pipeline_id.to_string(), "jobs"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page);

            let response = self.get(url.clone()).await?;
            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string);

            let body = response.text().await?;
            let jobs: Vec<Job> = serde_json::from_str(&body)
                .map_err(|e| TriggerError::Lookup(format!("Malformed response from {url}: {e}")))?;
            all_jobs.extend(jobs);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!("Pipeline {pipeline_id} has {} jobs", all_jobs.len());
        Ok(all_jobs)
    }

    pub async fn play_job(&self, job_id: JobId) -> Result<()> {
        let url = self.url(&["jobs", &job_id.to_string(), "play"])?;
        self.post_action(url, |status, message| {
            TriggerError::Lookup(format!("Failed to play job {job_id} (status {status}): {message}"))
        })
        .await?;
        info!("Played job {job_id}");
        Ok(())
    }

    /// Raw log of a job.
    pub async fn job_trace(&self, job_id: JobId) -> Result<String> {
        let url = self.url(&["jobs", &job_id.to_string(), "trace"])?;
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }
}
