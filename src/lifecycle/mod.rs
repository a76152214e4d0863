pub mod api;
pub mod env;
pub mod manual;
pub mod orchestrator;
pub mod poller;
pub mod sleeper;
#[cfg(test)]
mod testing;

use std::io::Write;

use log::{debug, info, warn};

use crate::auth::Token;
use crate::error::{Result, TriggerError, EXIT_PIPELINE_FAILED};
use crate::output::{jobs_table, Reporter};
use crate::providers::gitlab::pipeline_url;
use crate::providers::gitlab::types::PipelineId;
use crate::providers::HandleCache;

use self::api::PipelineApi;
use self::env::TriggerRequest;
use self::manual::ManualJobs;
use self::orchestrator::{Launch, Orchestrator, RetryIntent};
use self::poller::{OnManual, PollConfig, Poller};
use self::sleeper::Sleeper;

/// Everything one run needs, resolved from the command line and config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub url_path: String,
    pub api_token: Option<Token>,
    pub pipeline_token: Option<Token>,
    pub verify_ssl: bool,
    pub project_id: String,
    pub target_ref: String,
    /// `key=value` assignments, in command-line order
    pub env: Vec<String>,
    pub intent: RetryIntent,
    pub detached: bool,
    pub output: bool,
    pub poll: PollConfig,
    pub manual_jobs: ManualJobs,
}

impl Settings {
    /// Rejects combinations that cannot work before any request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(TriggerError::Configuration("A project id is required".into()));
        }
        if self.target_ref.trim().is_empty() {
            return Err(TriggerError::Configuration("A target ref is required".into()));
        }
        if self.pipeline_token.is_none() {
            return Err(TriggerError::Configuration(
                "A pipeline token is required to create pipelines (--pipeline-token)".into(),
            ));
        }

        let playing = self.poll.on_manual() == OnManual::Play;
        if self.api_token.is_none() && (self.intent.needs_credential() || !self.detached || playing) {
            return Err(TriggerError::Configuration(
                "An API token is required to query pipelines (--api-token); \
                 use --detached to only trigger"
                    .into(),
            ));
        }
        if matches!(self.manual_jobs, ManualJobs::Named(_)) && !playing {
            return Err(TriggerError::Configuration(
                "--jobs only applies together with --on-manual play".into(),
            ));
        }

        Ok(())
    }

    pub fn trigger_request(&self) -> Result<TriggerRequest> {
        let token = self.pipeline_token.clone().ok_or_else(|| {
            TriggerError::Configuration("A pipeline token is required (--pipeline-token)".into())
        })?;
        Ok(TriggerRequest::new(&self.target_ref, &self.env, token))
    }
}

/// One invocation: settings plus the handles it creates along the way.
pub struct Session {
    settings: Settings,
    cache: HandleCache,
}

impl Session {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let cache = HandleCache::new(settings.verify_ssl);
        Ok(Self { settings, cache })
    }

    pub async fn run<S: Sleeper, W: Write>(
        &mut self,
        sleeper: &S,
        out: &mut Reporter<W>,
    ) -> Result<PipelineId> {
        let project = self.cache.project(
            &self.settings.host,
            &self.settings.url_path,
            self.settings.api_token.as_ref(),
            &self.settings.project_id,
        )?;

        drive(project.as_ref(), &self.settings, sleeper, out).await
    }
}

/// Launches the pipeline and, unless detached, waits for its outcome.
///
/// # Errors
///
/// `PipelineFailure` carrying the pipeline id when the pipeline did not
/// succeed; the failure line is already printed at that point.
pub async fn drive<A: PipelineApi, S: Sleeper, W: Write>(
    api: &A,
    settings: &Settings,
    sleeper: &S,
    out: &mut Reporter<W>,
) -> Result<PipelineId> {
    let orchestrator = Orchestrator::new(api);
    let launch = orchestrator
        .launch(&settings.trigger_request()?, settings.intent, out)
        .await?;
    let pipeline_id = launch.pipeline_id();
    if let Launch::Recreated { previous, action, .. } = launch {
        info!("Pipeline {previous} replaced by {pipeline_id} ({action:?})");
    }

    if settings.detached {
        out.line("Detached mode: not monitoring pipeline status - exiting now.")?;
        return Ok(pipeline_id);
    }

    out.line(format!("Waiting for pipeline {pipeline_id} to finish ..."))?;
    let mut poller = Poller::new(api, sleeper, settings.poll)
        .with_manual_jobs(settings.manual_jobs.clone());
    let outcome = poller.wait(pipeline_id, out).await?;
    debug!("Pipeline {} finished as {}", outcome.pipeline_id, outcome.status);

    if settings.output {
        print_job_output(api, pipeline_id, out).await?;
    }

    if outcome.succeeded() {
        out.success("Pipeline succeeded")?;
        return Ok(pipeline_id);
    }

    if let Some(cause) = &outcome.cause {
        debug!("Pipeline {pipeline_id} failed: {cause}");
    }
    let details = match outcome.web_url {
        Some(url) => Some(url),
        None => orchestrator
            .web_url()
            .await
            .map(|web_url| pipeline_url(web_url, pipeline_id)),
    };
    match details {
        Some(url) => out.failure(format!("Pipeline failed! Check details at '{url}'"))?,
        None => out.failure(format!("Pipeline failed with status {}", outcome.status))?,
    }

    Err(TriggerError::PipelineFailure {
        pipeline_id,
        return_code: EXIT_PIPELINE_FAILED,
    })
}

/// Job summary table followed by every job's log.
async fn print_job_output<A: PipelineApi, W: Write>(
    api: &A,
    pipeline_id: PipelineId,
    out: &mut Reporter<W>,
) -> Result<()> {
    let jobs = api.jobs(pipeline_id).await?;
    let table = jobs_table(&jobs, out.colors());
    out.blank()?;
    out.line(table)?;

    for job in &jobs {
        match api.job_trace(job.id).await {
            Ok(trace) => {
                out.blank()?;
                out.heading(format!("Job: {} ({})", job.name, job.status))?;
                out.line(trace.trim_end())?;
            }
            Err(err) => warn!("Could not fetch log of job {} ({}): {err}", job.name, job.id),
        }
    }

    Ok(())
}
