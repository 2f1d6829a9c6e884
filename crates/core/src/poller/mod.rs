// crates/core/src/poller/mod.rs
//! Job polling for asynchronous generation work.
//!
//! Provides:
//! - `JobPoller`: spawns one polling loop per job and tracks it for cancellation
//! - `PollPolicy`: interval, backoff and give-up ceilings
//! - `JobReconciler`: the store operations a finished poll calls
//! - `PollUpdate`: broadcast progress for watchers

pub mod policy;
pub mod runner;
pub mod types;

pub use policy::{PollPolicy, DEFAULT_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS};
pub use runner::JobPoller;
pub use types::{JobReconciler, PollEvent, PollOutcome, PollTarget, PollUpdate};
