use log::{debug, info};
use reqwest::StatusCode;

use super::core::{error_text, GitLabProject};
use crate::error::{Result, TriggerError};
use crate::lifecycle::env::TriggerRequest;
use crate::providers::gitlab::types::{Commit, CreatedPipeline, Pipeline, PipelineId, Project};

impl GitLabProject {
    /// Creates a pipeline through the trigger endpoint.
    ///
    /// The trigger token travels in the form body, so no access token is
    /// needed. Anything but `201 Created` is a trigger failure.
    pub async fn create_pipeline(&self, request: &TriggerRequest) -> Result<PipelineId> {
        let url = self.url(&["trigger", "pipeline"])?;
        debug!("POST {url}");

        let response = self
            .gitlab()
            .client()
            .post(url)
            .form(&request.form_fields())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(TriggerError::Trigger {
                status: status.as_u16(),
                message: error_text(response).await,
            });
        }

        let body = response.text().await?;
        let created: CreatedPipeline = serde_json::from_str(&body).map_err(|e| TriggerError::Trigger {
            status: status.as_u16(),
            message: format!("Malformed trigger response: {e}"),
        })?;

        info!("Created pipeline {} for ref '{}'", created.id, request.ref_);
        Ok(created.id)
    }

    pub async fn pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline> {
        let url = self.url(&["pipelines", &pipeline_id.to_string()])?;
        self.get_json(url).await
    }

    /// Most recent pipeline for `ref_`, "most recent" being the highest id.
    pub async fn latest_pipeline(&self, ref_: &str) -> Result<Option<Pipeline>> {
        let mut url = self.url(&["pipelines"])?;
        url.query_pairs_mut()
            .append_pair("ref", ref_)
            .append_pair("order_by", "id")
            .append_pair("sort", "desc")
            .append_pair("per_page", "1");

        let pipelines: Vec<Pipeline> = self.get_json(url).await?;
        Ok(pipelines.into_iter().max_by_key(|pipeline| pipeline.id))
    }

    /// Commit id currently at the tip of `ref_`.
    pub async fn ref_tip(&self, ref_: &str) -> Result<String> {
        let url = self.url(&["repository", "commits", ref_])?;
        let commit: Commit = self.get_json(url).await?;
        Ok(commit.id)
    }

    pub async fn retry_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        let url = self.url(&["pipelines", &pipeline_id.to_string(), "retry"])?;
        self.post_action(url, |status, message| TriggerError::Trigger {
            status: status.as_u16(),
            message,
        })
        .await?;
        info!("Retried pipeline {pipeline_id}");
        Ok(())
    }

    pub async fn web_url(&self) -> Result<String> {
        let url = self.url(&[])?;
        let project: Project = self.get_json(url).await?;
        Ok(project.web_url)
    }
}
