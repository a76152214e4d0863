//! Scripted in-memory [`PipelineApi`] for lifecycle tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::auth::Token;
use crate::error::{Result, TriggerError};
use crate::lifecycle::api::PipelineApi;
use crate::lifecycle::env::TriggerRequest;
use crate::output::Reporter;
use crate::providers::gitlab::types::{Job, JobId, JobStatus, Pipeline, PipelineId, PipelineStatus};

/// Current tip of every ref in scripted projects.
pub const TIP: &str = "6104942438c14ec7bd21c6cd5bd995272b3faff6";

pub fn pipeline(id: u64, status: PipelineStatus, sha: &str) -> Pipeline {
    Pipeline {
        id: PipelineId(id),
        status,
        sha: sha.to_string(),
        ref_: Some("master".to_string()),
        web_url: Some("https://example.com/project1".to_string()),
    }
}

pub fn job(id: u64, name: &str, stage: &str, status: JobStatus) -> Job {
    Job {
        id: JobId(id),
        name: name.to_string(),
        stage: stage.to_string(),
        status,
    }
}

pub fn transcript(reporter: Reporter<Vec<u8>>) -> String {
    String::from_utf8(reporter.into_inner()).unwrap()
}

pub struct ScriptedApi {
    pub credential: bool,
    /// `None` makes the web URL lookup fail
    pub web_url: Option<String>,
    pub latest: Option<Pipeline>,
    /// Answers to successive status queries; an empty queue fails the query
    pub statuses: RefCell<VecDeque<Result<Pipeline>>>,
    pub jobs: RefCell<Vec<Job>>,
    pub traces: HashMap<JobId, String>,
    pub create_calls: Cell<usize>,
    pub requested: RefCell<Vec<PipelineId>>,
    pub retried: RefCell<Vec<PipelineId>>,
    pub played: RefCell<Vec<String>>,
    /// Number of upcoming play calls that fail
    pub play_failures: Cell<usize>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            credential: true,
            web_url: Some("https://example.com/project1".to_string()),
            latest: None,
            statuses: RefCell::new(VecDeque::new()),
            jobs: RefCell::new(Vec::new()),
            traces: HashMap::new(),
            create_calls: Cell::new(0),
            requested: RefCell::new(Vec::new()),
            retried: RefCell::new(Vec::new()),
            played: RefCell::new(Vec::new()),
            play_failures: Cell::new(0),
        }
    }

    pub fn request(&self) -> TriggerRequest {
        TriggerRequest::new("master", &[], Token::from("trigger_token"))
    }

    pub fn push_pipeline(&self, pipeline: Pipeline) {
        self.statuses.borrow_mut().push_back(Ok(pipeline));
    }

    /// Queues pipeline 1 on the current tip with `status`.
    pub fn push_status(&self, status: PipelineStatus) {
        self.push_pipeline(pipeline(1, status, TIP));
    }

    pub fn push_failure(&self) {
        self.statuses
            .borrow_mut()
            .push_back(Err(TriggerError::Lookup("connection reset".into())));
    }
}

impl PipelineApi for ScriptedApi {
    fn project_id(&self) -> &str {
        "123"
    }

    fn has_credential(&self) -> bool {
        self.credential
    }

    fn status_query_hint(&self, pipeline_id: PipelineId) -> String {
        format!(
            "curl -s -H \"PRIVATE-TOKEN: $GITLAB_API_TOKEN\" \"https://example.com/api/v4/projects/123/pipelines/{pipeline_id}\""
        )
    }

    async fn create_pipeline(&self, _request: &TriggerRequest) -> Result<PipelineId> {
        self.create_calls.set(self.create_calls.get() + 1);
        Ok(PipelineId(1))
    }

    async fn pipeline(&self, pipeline_id: PipelineId) -> Result<Pipeline> {
        self.requested.borrow_mut().push(pipeline_id);
        self.statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TriggerError::Lookup("no scripted status left".into())))
    }

    async fn latest_pipeline(&self, _ref: &str) -> Result<Option<Pipeline>> {
        Ok(self.latest.clone())
    }

    async fn ref_tip(&self, _ref: &str) -> Result<String> {
        Ok(TIP.to_string())
    }

    async fn retry_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        self.retried.borrow_mut().push(pipeline_id);
        Ok(())
    }

    async fn web_url(&self) -> Result<String> {
        self.web_url
            .clone()
            .ok_or_else(|| TriggerError::Lookup("project not found".into()))
    }

    async fn jobs(&self, _pipeline_id: PipelineId) -> Result<Vec<Job>> {
        Ok(self.jobs.borrow().clone())
    }

    async fn play_job(&self, job_id: JobId) -> Result<()> {
        if self.play_failures.get() > 0 {
            self.play_failures.set(self.play_failures.get() - 1);
            return Err(TriggerError::Lookup(format!("job {job_id} could not be played")));
        }
        let mut jobs = self.jobs.borrow_mut();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| TriggerError::Lookup(format!("job {job_id} not found")))?;
        job.status = JobStatus::Pending;
        self.played.borrow_mut().push(job.name.clone());
        Ok(())
    }

    async fn job_trace(&self, job_id: JobId) -> Result<String> {
        self.traces
            .get(&job_id)
            .cloned()
            .ok_or_else(|| TriggerError::Lookup(format!("no trace for job {job_id}")))
    }
}
