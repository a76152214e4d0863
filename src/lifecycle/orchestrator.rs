//! Decides whether a run creates a pipeline or retries an existing one.
//!
//! Retrying compares the existing pipeline's commit with the current tip of
//! the ref. A stale pipeline is replaced even when it failed, and a green
//! pipeline on the current tip is re-run by creating a new one; only a
//! non-green pipeline on the current tip is retried in place.

use std::cell::OnceCell;
use std::io::Write;

use log::{info, warn};

use crate::error::{Result, TriggerError};
use crate::lifecycle::api::PipelineApi;
use crate::lifecycle::env::TriggerRequest;
use crate::output::Reporter;
use crate::providers::gitlab::pipeline_url;
use crate::providers::gitlab::types::{Pipeline, PipelineId, PipelineStatus};

/// What the user asked for regarding existing pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryIntent {
    /// Create a new pipeline
    None,
    /// Retry the most recent pipeline of the target ref
    Latest,
    /// Retry the given pipeline
    Specific(PipelineId),
}

impl RetryIntent {
    /// An explicit pipeline id always names the pipeline to retry.
    pub fn from_flags(retry: bool, pipeline_id: Option<PipelineId>) -> Self {
        match (retry, pipeline_id) {
            (_, Some(pipeline_id)) => Self::Specific(pipeline_id),
            (true, None) => Self::Latest,
            (false, None) => Self::None,
        }
    }

    /// Every intent but plain creation queries pipeline state.
    pub fn needs_credential(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Outcome of the retry decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    RecreateOutdated,
    RecreateSucceeded,
    RetryInPlace,
}

/// How the pipeline to monitor came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    Created(PipelineId),
    Recreated {
        previous: PipelineId,
        pipeline_id: PipelineId,
        action: RetryAction,
    },
    Retried(PipelineId),
}

impl Launch {
    pub fn pipeline_id(&self) -> PipelineId {
        match *self {
            Self::Created(pipeline_id)
            | Self::Retried(pipeline_id)
            | Self::Recreated { pipeline_id, .. } => pipeline_id,
        }
    }
}

pub fn is_outdated(pipeline: &Pipeline, ref_tip: &str) -> bool {
    pipeline.sha != ref_tip
}

/// Staleness wins over success: a stale green pipeline is still outdated.
pub fn decide(pipeline: &Pipeline, ref_tip: &str) -> RetryAction {
    if is_outdated(pipeline, ref_tip) {
        RetryAction::RecreateOutdated
    } else if pipeline.status == PipelineStatus::Success {
        RetryAction::RecreateSucceeded
    } else {
        RetryAction::RetryInPlace
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

pub struct Orchestrator<'a, A> {
    api: &'a A,
    web_url: OnceCell<Option<String>>,
}

impl<'a, A: PipelineApi> Orchestrator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            web_url: OnceCell::new(),
        }
    }

    /// Produces the id of the pipeline to monitor.
    ///
    /// At most one pipeline is created or retried.
    pub async fn launch<W: Write>(
        &self,
        request: &TriggerRequest,
        intent: RetryIntent,
        out: &mut Reporter<W>,
    ) -> Result<Launch> {
        match intent {
            RetryIntent::None => self.create(request, out).await.map(Launch::Created),
            RetryIntent::Latest | RetryIntent::Specific(_) => {
                self.retry(request, intent, out).await
            }
        }
    }

    /// Project web URL, looked up once. Failures are logged, never raised.
    pub async fn web_url(&self) -> Option<&str> {
        if self.web_url.get().is_none() {
            let fetched = match self.api.web_url().await {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(
                        "Could not look up web URL of project {}: {err}",
                        self.api.project_id()
                    );
                    None
                }
            };
            let _ = self.web_url.set(fetched);
        }
        self.web_url.get().and_then(Option::as_deref)
    }

    async fn create<W: Write>(
        &self,
        request: &TriggerRequest,
        out: &mut Reporter<W>,
    ) -> Result<PipelineId> {
        out.line(format!(
            "Triggering pipeline for ref '{}' for project id {}",
            request.ref_,
            self.api.project_id()
        ))?;

        let pipeline_id = self.api.create_pipeline(request).await?;
        out.line(format!("Pipeline created (id: {pipeline_id})"))?;
        self.print_link(pipeline_id, out).await?;

        Ok(pipeline_id)
    }

    async fn retry<W: Write>(
        &self,
        request: &TriggerRequest,
        intent: RetryIntent,
        out: &mut Reporter<W>,
    ) -> Result<Launch> {
        self.require_credential("retry a pipeline")?;

        let pipeline = self.target_pipeline(&request.ref_, intent, out).await?;
        let ref_tip = self.api.ref_tip(&request.ref_).await?;
        let action = decide(&pipeline, &ref_tip);
        info!(
            "Pipeline {} ({}, sha {}) vs ref tip {}: {action:?}",
            pipeline.id, pipeline.status, pipeline.sha, ref_tip
        );

        match action {
            RetryAction::RecreateOutdated => {
                out.line(format!(
                    "Pipeline {} is outdated (sha {}, ref '{}' is at {}), creating a new one",
                    pipeline.id,
                    short_sha(&pipeline.sha),
                    request.ref_,
                    short_sha(&ref_tip)
                ))?;
            }
            RetryAction::RecreateSucceeded => {
                out.line(format!(
                    "Pipeline {} already succeeded, creating a new one",
                    pipeline.id
                ))?;
            }
            RetryAction::RetryInPlace => {
                out.line(format!(
                    "Retrying pipeline {} ({})",
                    pipeline.id, pipeline.status
                ))?;
                self.api.retry_pipeline(pipeline.id).await?;
                self.print_link(pipeline.id, out).await?;
                return Ok(Launch::Retried(pipeline.id));
            }
        }

        let pipeline_id = self.create(request, out).await?;
        Ok(Launch::Recreated {
            previous: pipeline.id,
            pipeline_id,
            action,
        })
    }

    async fn target_pipeline<W: Write>(
        &self,
        ref_: &str,
        intent: RetryIntent,
        out: &mut Reporter<W>,
    ) -> Result<Pipeline> {
        if let RetryIntent::Specific(pipeline_id) = intent {
            let pipeline = self.api.pipeline(pipeline_id).await?;
            if let Some(pipeline_ref) = pipeline.ref_.as_deref().filter(|r| *r != ref_) {
                warn!("Pipeline {pipeline_id} runs on ref '{pipeline_ref}', comparing with '{ref_}'");
            }
            return Ok(pipeline);
        }

        out.line(format!(
            "Looking up latest pipeline for ref '{ref_}' for project id {}",
            self.api.project_id()
        ))?;
        self.api
            .latest_pipeline(ref_)
            .await?
            .ok_or_else(|| TriggerError::Lookup(format!("No pipeline found for ref '{ref_}'")))
    }

    async fn print_link<W: Write>(
        &self,
        pipeline_id: PipelineId,
        out: &mut Reporter<W>,
    ) -> Result<()> {
        if let Some(web_url) = self.web_url().await {
            out.line(format!("See pipeline at {}", pipeline_url(web_url, pipeline_id)))?;
        }
        Ok(())
    }

    fn require_credential(&self, action: &str) -> Result<()> {
        if self.api.has_credential() {
            Ok(())
        } else {
            Err(TriggerError::Configuration(format!(
                "An API token is required to {action}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::testing::{pipeline, transcript, ScriptedApi, TIP};

    const STALE: &str = "0000000000000000000000000000000000000000";

    async fn launch(api: &ScriptedApi, intent: RetryIntent) -> (Result<Launch>, String) {
        let mut out = Reporter::new(Vec::new(), false);
        let orchestrator = Orchestrator::new(api);
        let result = orchestrator.launch(&api.request(), intent, &mut out).await;
        (result, transcript(out))
    }

    #[test]
    fn test_intent_from_flags() {
        assert_eq!(RetryIntent::from_flags(false, None), RetryIntent::None);
        assert_eq!(
            RetryIntent::from_flags(false, Some(PipelineId(123))),
            RetryIntent::Specific(PipelineId(123))
        );
        assert_eq!(RetryIntent::from_flags(true, None), RetryIntent::Latest);
        assert_eq!(
            RetryIntent::from_flags(true, Some(PipelineId(123))),
            RetryIntent::Specific(PipelineId(123))
        );
    }

    #[test]
    fn test_decide_outdated_wins_over_status() {
        for status in [
            PipelineStatus::Success,
            PipelineStatus::Failed,
            PipelineStatus::Canceled,
            PipelineStatus::Running,
        ] {
            let stale = pipeline(5, status, STALE);
            assert!(is_outdated(&stale, TIP));
            assert_eq!(decide(&stale, TIP), RetryAction::RecreateOutdated);
        }
    }

    #[test]
    fn test_decide_on_current_tip() {
        let green = pipeline(5, PipelineStatus::Success, TIP);
        assert_eq!(decide(&green, TIP), RetryAction::RecreateSucceeded);

        let red = pipeline(5, PipelineStatus::Failed, TIP);
        assert_eq!(decide(&red, TIP), RetryAction::RetryInPlace);
    }

    #[tokio::test]
    async fn test_create_prints_link() {
        let api = ScriptedApi::new();

        let (result, output) = launch(&api, RetryIntent::None).await;

        assert_eq!(result.unwrap(), Launch::Created(PipelineId(1)));
        assert_eq!(api.create_calls.get(), 1);
        assert_eq!(
            output,
            "Triggering pipeline for ref 'master' for project id 123\n\
             Pipeline created (id: 1)\n\
             See pipeline at https://example.com/project1/pipelines/1\n"
        );
    }

    #[tokio::test]
    async fn test_web_url_failure_is_swallowed() {
        let mut api = ScriptedApi::new();
        api.web_url = None;

        let (result, output) = launch(&api, RetryIntent::None).await;

        assert_eq!(result.unwrap(), Launch::Created(PipelineId(1)));
        assert!(!output.contains("See pipeline at"));
    }

    #[tokio::test]
    async fn test_outdated_failed_pipeline_is_recreated() {
        let mut api = ScriptedApi::new();
        api.latest = Some(pipeline(5, PipelineStatus::Failed, STALE));

        let (result, output) = launch(&api, RetryIntent::Latest).await;

        assert_eq!(
            result.unwrap(),
            Launch::Recreated {
                previous: PipelineId(5),
                pipeline_id: PipelineId(1),
                action: RetryAction::RecreateOutdated,
            }
        );
        assert_eq!(api.create_calls.get(), 1);
        assert!(api.retried.borrow().is_empty());
        assert!(output.contains("Pipeline 5 is outdated (sha 00000000, ref 'master' is at 61049424)"));
    }

    #[tokio::test]
    async fn test_succeeded_pipeline_is_recreated() {
        let mut api = ScriptedApi::new();
        api.latest = Some(pipeline(5, PipelineStatus::Success, TIP));

        let (result, output) = launch(&api, RetryIntent::Latest).await;

        assert_eq!(result.unwrap().pipeline_id(), PipelineId(1));
        assert_eq!(api.create_calls.get(), 1);
        assert!(api.retried.borrow().is_empty());
        assert!(output.contains("Pipeline 5 already succeeded, creating a new one"));
    }

    #[tokio::test]
    async fn test_failed_pipeline_on_tip_is_retried_in_place() {
        let mut api = ScriptedApi::new();
        api.latest = Some(pipeline(5, PipelineStatus::Failed, TIP));

        let (result, output) = launch(&api, RetryIntent::Latest).await;

        assert_eq!(result.unwrap(), Launch::Retried(PipelineId(5)));
        assert_eq!(api.create_calls.get(), 0);
        assert_eq!(*api.retried.borrow(), vec![PipelineId(5)]);
        assert!(output.contains("Retrying pipeline 5 (failed)"));
        assert!(output.contains("See pipeline at https://example.com/project1/pipelines/5"));
    }

    #[tokio::test]
    async fn test_specific_pipeline_is_fetched_by_id() {
        let api = ScriptedApi::new();
        api.push_pipeline(pipeline(42, PipelineStatus::Canceled, TIP));

        let (result, output) = launch(&api, RetryIntent::Specific(PipelineId(42))).await;

        assert_eq!(result.unwrap(), Launch::Retried(PipelineId(42)));
        assert_eq!(*api.requested.borrow(), vec![PipelineId(42)]);
        assert!(!output.contains("Looking up latest pipeline"));
    }

    #[tokio::test]
    async fn test_no_pipeline_for_ref() {
        let api = ScriptedApi::new();

        let (result, _) = launch(&api, RetryIntent::Latest).await;

        assert!(matches!(result, Err(TriggerError::Lookup(_))));
        assert_eq!(api.create_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_retry_requires_credential() {
        let mut api = ScriptedApi::new();
        api.credential = false;
        api.latest = Some(pipeline(5, PipelineStatus::Failed, TIP));

        let (result, output) = launch(&api, RetryIntent::Latest).await;

        assert!(matches!(result, Err(TriggerError::Configuration(_))));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_pid_without_retry_flag_runs_decision_table() {
        let api = ScriptedApi::new();
        api.push_pipeline(pipeline(42, PipelineStatus::Failed, TIP));
        let intent = RetryIntent::from_flags(false, Some(PipelineId(42)));

        let (result, output) = launch(&api, intent).await;

        assert_eq!(result.unwrap(), Launch::Retried(PipelineId(42)));
        assert_eq!(*api.retried.borrow(), vec![PipelineId(42)]);
        assert_eq!(api.create_calls.get(), 0);
        assert!(output.starts_with("Retrying pipeline 42 (failed)"));
    }

    #[tokio::test]
    async fn test_pid_without_retry_flag_recreates_stale_pipeline() {
        let api = ScriptedApi::new();
        api.push_pipeline(pipeline(42, PipelineStatus::Running, STALE));
        let intent = RetryIntent::from_flags(false, Some(PipelineId(42)));

        let (result, _) = launch(&api, intent).await;

        assert_eq!(
            result.unwrap(),
            Launch::Recreated {
                previous: PipelineId(42),
                pipeline_id: PipelineId(1),
                action: RetryAction::RecreateOutdated,
            }
        );
        assert_eq!(api.create_calls.get(), 1);
        assert!(api.retried.borrow().is_empty());
    }
}
