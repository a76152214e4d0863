use clap::{ArgAction, Parser};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{Result, TriggerError};
use crate::lifecycle::env::parse_assignment;
use crate::lifecycle::manual::ManualJobs;
use crate::lifecycle::orchestrator::RetryIntent;
use crate::lifecycle::poller::{OnManual, PollConfig, DEFAULT_MAX_FAILURES, DEFAULT_SLEEP_SECONDS};
use crate::lifecycle::sleeper::TokioSleeper;
use crate::lifecycle::{Session, Settings};
use crate::output::Reporter;
use crate::providers::gitlab::types::PipelineId;
use crate::providers::gitlab::DEFAULT_URL_PATH;

const DEFAULT_HOST: &str = "https://gitlab.com";
const DEFAULT_TARGET_REF: &str = "master";

#[derive(Parser, Debug)]
#[command(name = "trigger")]
#[command(author, version, about = "Trigger and monitor GitLab pipelines", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// API token used to query pipelines and play jobs
    #[arg(short, long, env = "GITLAB_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Pipeline trigger token
    #[arg(short, long, env = "GITLAB_PIPELINE_TOKEN", hide_env_values = true)]
    pipeline_token: Option<String>,

    /// GitLab host [default: https://gitlab.com]
    #[arg(short = 'h', long, env = "GITLAB_HOST")]
    host: Option<String>,

    /// REST path of the projects collection [default: /api/v4/projects]
    #[arg(short, long)]
    url_path: Option<String>,

    /// Branch, tag or commit to run the pipeline for
    #[arg(short, long, default_value = DEFAULT_TARGET_REF)]
    target_ref: String,

    /// Pipeline variable, repeatable
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    env: Vec<String>,

    /// Retry the latest pipeline of the target ref, or the one given with --pid
    #[arg(short, long)]
    retry: bool,

    /// Existing pipeline to retry instead of the latest one of the target ref
    #[arg(long)]
    pid: Option<u64>,

    /// Seconds between two status queries [default: 5]
    #[arg(short, long)]
    sleep: Option<u64>,

    /// Exit right after triggering, without monitoring
    #[arg(short, long)]
    detached: bool,

    /// Print job logs once the pipeline finished
    #[arg(short, long)]
    output: bool,

    /// What to do when the pipeline waits for manual jobs [default: stop]
    #[arg(long, value_enum)]
    on_manual: Option<OnManual>,

    /// Manual jobs to play, in order (with --on-manual play)
    #[arg(long, value_delimiter = ',')]
    jobs: Vec<String>,

    /// Consecutive status query failures tolerated [default: 5]
    #[arg(long)]
    max_failures: Option<u32>,

    /// Do not verify TLS certificates
    #[arg(long)]
    no_verify_ssl: bool,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// GitLab project id or path
    project_id: String,
}

impl Cli {
    /// Resolves flags against the config file and built-in defaults.
    pub fn settings(&self, config: Config) -> Result<Settings> {
        let Config { gitlab, polling } = config;

        let interval = self.sleep.or(polling.sleep).unwrap_or(DEFAULT_SLEEP_SECONDS);
        let poll = PollConfig::new(
            Duration::from_secs(interval),
            self.max_failures
                .or(polling.max_failures)
                .unwrap_or(DEFAULT_MAX_FAILURES),
            self.on_manual.or(polling.on_manual).unwrap_or_default(),
        )?;

        Ok(Settings {
            host: self
                .host
                .clone()
                .or(gitlab.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            url_path: self
                .url_path
                .clone()
                .or(gitlab.url_path)
                .unwrap_or_else(|| DEFAULT_URL_PATH.to_string()),
            api_token: self.api_token.clone().or(gitlab.api_token).map(Token::from),
            pipeline_token: self
                .pipeline_token
                .clone()
                .or(gitlab.pipeline_token)
                .map(Token::from),
            verify_ssl: !self.no_verify_ssl && gitlab.verify_ssl.unwrap_or(true),
            project_id: self.project_id.clone(),
            target_ref: self.target_ref.clone(),
            env: self.env.clone(),
            intent: RetryIntent::from_flags(self.retry, self.pid.map(PipelineId)),
            detached: self.detached,
            output: self.output,
            poll,
            manual_jobs: ManualJobs::from_names(&self.jobs),
        })
    }

    pub async fn execute(&self) -> Result<PipelineId> {
        let config = Config::load(self.config.as_deref())
            .map_err(|e| TriggerError::Configuration(format!("{e:#}")))?;
        let settings = self.settings(config)?;
        info!(
            "Running for project {} on {} (intent {:?})",
            settings.project_id, settings.host, settings.intent
        );

        let mut session = Session::new(settings)?;
        let mut out = Reporter::stdout();
        session.run(&TokioSleeper, &mut out).await
    }
}
