use std::io::Write;
use std::time::Duration;

use clap::ValueEnum;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::{Result, TriggerError};
use crate::lifecycle::api::PipelineApi;
use crate::lifecycle::manual::{ManualJobPlayer, ManualJobs};
use crate::lifecycle::sleeper::Sleeper;
use crate::output::Reporter;
use crate::providers::gitlab::types::{Pipeline, PipelineId, PipelineStatus};

pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_SLEEP_SECONDS: u64 = 5;

/// What a pipeline waiting on manual jobs means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnManual {
    /// The pipeline failed
    #[default]
    Stop,
    /// The pipeline succeeded
    Pass,
    /// Play the manual jobs and keep waiting
    Play,
}

/// Validated polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    max_failures: u32,
    on_manual: OnManual,
}

impl PollConfig {
    pub fn new(interval: Duration, max_failures: u32, on_manual: OnManual) -> Result<Self> {
        if interval.is_zero() {
            return Err(TriggerError::Configuration(
                "Sleep interval must be a positive number of seconds".into(),
            ));
        }
        if max_failures == 0 {
            return Err(TriggerError::Configuration(
                "Maximum consecutive status query failures must be at least 1".into(),
            ));
        }

        Ok(Self {
            interval,
            max_failures,
            on_manual,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn on_manual(&self) -> OnManual {
        self.on_manual
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SLEEP_SECONDS),
            max_failures: DEFAULT_MAX_FAILURES,
            on_manual: OnManual::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    ManualPending,
    Succeeded,
    Failed,
}

/// Final observation of a monitored pipeline.
#[derive(Debug)]
pub struct PollOutcome {
    pub pipeline_id: PipelineId,
    pub state: PollState,
    pub status: PipelineStatus,
    pub web_url: Option<String>,
    /// Why the pipeline counts as failed when its own status does not say so
    pub cause: Option<TriggerError>,
}

impl PollOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == PollState::Succeeded
    }
}

/// Waits for a pipeline to reach a terminal status.
///
/// Only consecutive transient failures count against the budget, whether
/// they come from the status query or from playing manual jobs. Any
/// successful poll restores it.
pub struct Poller<'a, A, S> {
    api: &'a A,
    sleeper: &'a S,
    config: PollConfig,
    player: ManualJobPlayer,
}

impl<'a, A: PipelineApi, S: Sleeper> Poller<'a, A, S> {
    pub fn new(api: &'a A, sleeper: &'a S, config: PollConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
            player: ManualJobPlayer::new(ManualJobs::All),
        }
    }

    /// Manual jobs to play when the policy is [`OnManual::Play`].
    pub fn with_manual_jobs(mut self, selection: ManualJobs) -> Self {
        self.player = ManualJobPlayer::new(selection);
        self
    }

    pub async fn wait<W: Write>(
        &mut self,
        pipeline_id: PipelineId,
        out: &mut Reporter<W>,
    ) -> Result<PollOutcome> {
        let max_failures = self.config.max_failures();
        let mut failures_left = max_failures;

        loop {
            let observed = match self.api.pipeline(pipeline_id).await {
                Ok(pipeline) => self.observe(pipeline_id, pipeline, out).await,
                Err(err) => Err(err),
            };

            let finished = match observed {
                Ok(finished) => {
                    failures_left = max_failures;
                    finished
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    failures_left -= 1;
                    warn!(
                        "Failed to poll pipeline {pipeline_id} ({failures_left} attempts left): {err}"
                    );

                    if failures_left == 0 {
                        out.progress()?;
                        out.line(format!(
                            "Status of pipeline {pipeline_id} could not be queried {max_failures} times in a row, giving up. Verify manually with:"
                        ))?;
                        out.line(self.api.status_query_hint(pipeline_id))?;
                        return Err(TriggerError::PollingExhausted {
                            pipeline_id,
                            attempts: max_failures,
                        });
                    }
                    None
                }
            };

            out.progress()?;

            if let Some(outcome) = finished {
                return Ok(outcome);
            }

            self.sleeper.sleep(self.config.interval()).await;
        }
    }

    /// Classifies one status answer, playing manual jobs when the policy says
    /// so. Returns the outcome once the pipeline is finished.
    async fn observe<W: Write>(
        &mut self,
        pipeline_id: PipelineId,
        pipeline: Pipeline,
        out: &mut Reporter<W>,
    ) -> Result<Option<PollOutcome>> {
        debug!("Pipeline {pipeline_id} is {}", pipeline.status);

        let mut cause = None;
        let mut state = self.classify(pipeline.status);
        if state == PollState::ManualPending {
            state = match self.player.play(self.api, pipeline_id, out).await {
                Ok(_) => PollState::Polling,
                Err(err @ TriggerError::NoManualJobs { .. }) => {
                    cause = Some(err);
                    PollState::Failed
                }
                Err(err) => return Err(err),
            };
        }

        if !matches!(state, PollState::Succeeded | PollState::Failed) {
            return Ok(None);
        }

        Ok(Some(PollOutcome {
            pipeline_id,
            state,
            status: pipeline.status,
            web_url: pipeline.web_url,
            cause,
        }))
    }

    fn classify(&self, status: PipelineStatus) -> PollState {
        match (status, self.config.on_manual()) {
            (PipelineStatus::Success, _) => PollState::Succeeded,
            (PipelineStatus::Manual | PipelineStatus::Skipped, OnManual::Play) => {
                PollState::ManualPending
            }
            (PipelineStatus::Manual, OnManual::Pass) => PollState::Succeeded,
            (status, _) if status.is_terminal() => PollState::Failed,
            _ => PollState::Polling,
        }
    }
}
