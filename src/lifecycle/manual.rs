use std::collections::HashSet;
use std::io::Write;

use log::debug;

use crate::error::{Result, TriggerError};
use crate::lifecycle::api::PipelineApi;
use crate::output::Reporter;
use crate::providers::gitlab::types::{Job, JobStatus, PipelineId};

/// Which manual jobs to play once the pipeline waits for them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManualJobs {
    /// Every manual job, in listing order
    #[default]
    All,
    /// These jobs, in this order; a missing name is fatal
    Named(Vec<String>),
}

impl ManualJobs {
    /// An empty list means all jobs. Repeated names are kept once.
    pub fn from_names(names: &[String]) -> Self {
        let mut seen = HashSet::new();
        let unique: Vec<String> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty() && seen.insert(name.to_string()))
            .map(ToString::to_string)
            .collect();

        if unique.is_empty() {
            Self::All
        } else {
            Self::Named(unique)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SelectionError {
    NoManualJobs,
    Missing(String),
}

/// Picks the manual jobs to play from a pipeline's job list.
///
/// Jobs named in `already_played` were handled in an earlier round and are
/// left out.
pub fn select_jobs<'j>(
    jobs: &'j [Job],
    selection: &ManualJobs,
    already_played: &HashSet<String>,
) -> std::result::Result<Vec<&'j Job>, SelectionError> {
    let manual: Vec<&Job> = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Manual)
        .collect();

    let targets: Vec<&Job> = match selection {
        ManualJobs::All => manual
            .into_iter()
            .filter(|job| !already_played.contains(&job.name))
            .collect(),
        ManualJobs::Named(names) => {
            if manual.is_empty() {
                return Err(SelectionError::NoManualJobs);
            }
            let mut targets = Vec::with_capacity(names.len());
            for name in names.iter().filter(|name| !already_played.contains(*name)) {
                let job = manual
                    .iter()
                    .find(|job| &job.name == name)
                    .ok_or_else(|| SelectionError::Missing(name.clone()))?;
                targets.push(*job);
            }
            targets
        }
    };

    if targets.is_empty() {
        Err(SelectionError::NoManualJobs)
    } else {
        Ok(targets)
    }
}

/// Plays manual jobs of the monitored pipeline, round after round.
pub struct ManualJobPlayer {
    selection: ManualJobs,
    played: HashSet<String>,
}

impl ManualJobPlayer {
    pub fn new(selection: ManualJobs) -> Self {
        Self {
            selection,
            played: HashSet::new(),
        }
    }

    /// Plays the selected manual jobs and returns how many were played.
    ///
    /// # Errors
    ///
    /// `NoManualJobs` when nothing is left to play, `ManualJobNotFound` when
    /// a requested job is not waiting for input.
    pub async fn play<A: PipelineApi, W: Write>(
        &mut self,
        api: &A,
        pipeline_id: PipelineId,
        out: &mut Reporter<W>,
    ) -> Result<usize> {
        let jobs = api.jobs(pipeline_id).await?;

        let targets = match select_jobs(&jobs, &self.selection, &self.played) {
            Ok(targets) => targets,
            Err(SelectionError::NoManualJobs) => {
                out.blank()?;
                out.line("No manual jobs found!")?;
                return Err(TriggerError::NoManualJobs { pipeline_id });
            }
            Err(SelectionError::Missing(name)) => {
                return Err(TriggerError::ManualJobNotFound { name, pipeline_id });
            }
        };

        for job in &targets {
            out.blank()?;
            out.line(format!(
                "Playing manual job \"{}\" from stage \"{}\"...",
                job.name, job.stage
            ))?;
            api.play_job(job.id).await?;
            self.played.insert(job.name.clone());
        }

        debug!("Played {} manual jobs of pipeline {pipeline_id}", targets.len());
        Ok(targets.len())
    }
}
