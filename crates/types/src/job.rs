// crates/types/src/job.rs
//! Job handles and status reports for asynchronous generation work.

use serde::{Deserialize, Serialize};

/// Handle returned by the backend when a generation job is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    /// Status at enqueue time. The backend sends `"queued"`; older builds omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: None,
        }
    }
}

/// Observed status of a job.
///
/// The backend reports free-form strings. `complete`/`success` and
/// `failed`/`error` are terminal; everything else keeps the poll alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Success,
    Failed,
    Error,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Error => "error",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Error)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "complete" => JobStatus::Complete,
            "success" => JobStatus::Success,
            "failed" => JobStatus::Failed,
            "error" => JobStatus::Error,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        JobStatus::from(value.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body of `GET /crew/status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusReport {
    pub fn new(status: impl Into<JobStatus>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Response of `POST /chapters/{id}/analyze-transition`.
///
/// Some backend builds enqueue a job and answer with a [`JobHandle`], others
/// answer with the analysis inline. Both shapes are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionAnalysis(pub serde_json::Value);

impl TransitionAnalysis {
    /// Job handle carried by the response, if the analysis was enqueued.
    pub fn job_handle(&self) -> Option<JobHandle> {
        let job_id = self.0.get("job_id")?.as_str()?;
        if job_id.is_empty() {
            return None;
        }
        Some(JobHandle {
            job_id: job_id.to_string(),
            status: self
                .0
                .get("status")
                .and_then(|s| s.as_str())
                .map(str::to_string),
        })
    }
}
