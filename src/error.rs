use thiserror::Error;

use crate::providers::gitlab::types::PipelineId;

/// Exit code for a pipeline that finished in a non-success state.
pub const EXIT_PIPELINE_FAILED: u8 = 1;
/// Exit code for a status query that kept failing.
pub const EXIT_POLLING_EXHAUSTED: u8 = 2;
/// Exit code for invalid or missing configuration (sysexits `EX_USAGE`).
pub const EXIT_CONFIGURATION: u8 = 64;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to trigger pipeline (status {status}): {message}")]
    Trigger { status: u16, message: String },

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Status of pipeline {pipeline_id} could not be queried {attempts} times in a row")]
    PollingExhausted { pipeline_id: PipelineId, attempts: u32 },

    #[error("No manual jobs found in pipeline {pipeline_id}")]
    NoManualJobs { pipeline_id: PipelineId },

    #[error("Manual job \"{name}\" not found in pipeline {pipeline_id}")]
    ManualJobNotFound { name: String, pipeline_id: PipelineId },

    #[error("Pipeline {pipeline_id} did not succeed")]
    PipelineFailure { pipeline_id: PipelineId, return_code: u8 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TriggerError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PipelineFailure { return_code, .. } => *return_code,
            Self::PollingExhausted { .. } => EXIT_POLLING_EXHAUSTED,
            Self::Configuration(_) => EXIT_CONFIGURATION,
            _ => EXIT_PIPELINE_FAILED,
        }
    }

    /// Pipeline the failure refers to, when there is one.
    pub fn pipeline_id(&self) -> Option<PipelineId> {
        match self {
            Self::PollingExhausted { pipeline_id, .. }
            | Self::NoManualJobs { pipeline_id }
            | Self::ManualJobNotFound { pipeline_id, .. }
            | Self::PipelineFailure { pipeline_id, .. } => Some(*pipeline_id),
            _ => None,
        }
    }

    /// Failures worth another attempt on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Lookup(_))
    }

    /// Whether the message was already reported on the transcript.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            Self::PipelineFailure { .. } | Self::PollingExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TriggerError>;
