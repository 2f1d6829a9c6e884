// crates/core/src/poller/types.rs
//! Types for the job poller.

use async_trait::async_trait;
use bookforge_types::JobStatus;

/// What a poll watches and what it reconciles when the job ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub job_id: String,
    /// Id holding a processing marker; released on any terminal outcome.
    pub entity_id: String,
    /// Project refetched when the job succeeds.
    pub project_id: String,
}

impl PollTarget {
    pub fn new(
        job_id: impl Into<String>,
        entity_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            entity_id: entity_id.into(),
            project_id: project_id.into(),
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Job reached `complete`/`success`.
    Succeeded,
    /// Job reached `failed`/`error`.
    Failed { message: String },
    /// The status request itself failed.
    RequestFailed { message: String },
    /// The poll policy's attempt or duration ceiling was hit.
    TimedOut { attempts: u32 },
    /// Stopped by `cancel_polling`.
    Cancelled,
}

impl PollOutcome {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PollOutcome::Failed { message } | PollOutcome::RequestFailed { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A status observed on one tick.
    Status(JobStatus),
    /// The poll is over and reconciliation has run.
    Finished(PollOutcome),
}

/// Progress broadcast to poller subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollUpdate {
    pub job_id: String,
    pub entity_id: String,
    pub project_id: String,
    /// Status requests issued so far.
    pub attempt: u32,
    pub event: PollEvent,
}

impl PollUpdate {
    pub fn outcome(&self) -> Option<&PollOutcome> {
        match &self.event {
            PollEvent::Finished(outcome) => Some(outcome),
            PollEvent::Status(_) => None,
        }
    }
}

/// The store-side operations a finished poll calls back into.
#[async_trait]
pub trait JobReconciler: Send + Sync {
    /// Release one processing marker held by `entity_id`.
    fn clear_processing(&self, entity_id: &str);

    /// Refetch the authoritative project. Failures stay inside the store.
    async fn refresh_project(&self, project_id: &str);

    /// Record a human-readable failure.
    fn record_error(&self, message: String);

    /// Called once per successful job, before the refresh.
    fn job_succeeded(&self, _target: &PollTarget) {}
}
