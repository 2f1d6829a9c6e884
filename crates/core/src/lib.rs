// crates/core/src/lib.rs
//! Client-side state for bookforge: project and agent caches, the job poller
//! that tracks generation work, and user feedback queues.

pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod poller;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AppConfig, NotificationConfig};
pub use context::AppContext;
pub use error::*;
pub use feedback::{
    ConfirmationRequest, FeedbackStore, Notification, NotificationKind, PendingConfirmation,
};
pub use poller::{JobPoller, JobReconciler, PollEvent, PollOutcome, PollPolicy, PollTarget, PollUpdate};
pub use store::{AgentStore, GenerationStart, ProjectStore};
