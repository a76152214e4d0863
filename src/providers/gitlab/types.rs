use std::fmt;

use serde::{Deserialize, Deserializer};

/// Numeric GitLab pipeline id.
///
/// The trigger endpoint of some GitLab versions returns ids as JSON strings,
/// so both `1` and `"1"` deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u64);

/// Numeric GitLab job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl<'de> Deserialize<'de> for PipelineId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        numeric_id(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        numeric_id(deserializer).map(Self)
    }
}

fn numeric_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(id) => Ok(id),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline status as reported by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl PipelineStatus {
    /// Statuses after which the pipeline will not progress on its own.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Manual | Self::Canceled | Self::Success | Self::Skipped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status. Only `Manual` drives behavior; the rest is reported as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
    Scheduled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Preparing => "preparing",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GitLab CI/CD pipeline as returned by `GET /projects/:id/pipelines/:pid`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub status: PipelineStatus,
    /// Commit the pipeline was created for
    pub sha: String,
    /// Git reference the pipeline runs on (e.g., "main")
    #[serde(rename = "ref", default)]
    pub ref_: Option<String>,
    /// Link to the pipeline page
    #[serde(default)]
    pub web_url: Option<String>,
}

/// A job within a pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Job name as defined in .gitlab-ci.yml
    pub name: String,
    /// Stage this job belongs to
    pub stage: String,
    pub status: JobStatus,
}

/// Response of the trigger endpoint; only the id matters.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPipeline {
    pub id: PipelineId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Commit {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Project {
    pub web_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_id_accepts_number_and_string() {
        let created: CreatedPipeline = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert_eq!(created.id, PipelineId(1));

        let created: CreatedPipeline = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(created.id, PipelineId(42));

        assert!(serde_json::from_str::<CreatedPipeline>(r#"{"id": "abc"}"#).is_err());
    }

    #[test]
    fn test_pipeline_deserialization() {
        let pipeline: Pipeline = serde_json::from_str(
            r#"{
                "id": 1001,
                "iid": 12,
                "status": "waiting_for_resource",
                "ref": "main",
                "sha": "a91957a858320c0e17f3a0eca7cfacbff50ea29a",
                "web_url": "https://gitlab.example.com/group/project/-/pipelines/1001"
            }"#,
        )
        .unwrap();

        assert_eq!(pipeline.id, PipelineId(1001));
        assert_eq!(pipeline.status, PipelineStatus::WaitingForResource);
        assert_eq!(pipeline.ref_.as_deref(), Some("main"));
        assert!(!pipeline.status.is_terminal());
    }

    #[test]
    fn test_pipeline_without_status_is_rejected() {
        let result = serde_json::from_str::<Pipeline>(r#"{"id": 1, "sha": "abc"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_status_does_not_fail() {
        let status: PipelineStatus = serde_json::from_str(r#""brand_new_status""#).unwrap();
        assert_eq!(status, PipelineStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [
            PipelineStatus::Failed,
            PipelineStatus::Manual,
            PipelineStatus::Canceled,
            PipelineStatus::Success,
            PipelineStatus::Skipped,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
        for status in [
            PipelineStatus::Created,
            PipelineStatus::Pending,
            PipelineStatus::Running,
            PipelineStatus::Preparing,
        ] {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
    }

    #[test]
    fn test_job_status_display_matches_wire_name() {
        let status: JobStatus = serde_json::from_str(r#""waiting_for_resource""#).unwrap();
        assert_eq!(status.as_str(), "waiting_for_resource");
        assert_eq!(status.to_string(), "waiting_for_resource");
        assert_eq!(JobStatus::Manual.to_string(), "manual");
    }
}
