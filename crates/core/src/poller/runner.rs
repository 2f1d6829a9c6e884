// crates/core/src/poller/runner.rs
//! Job poller: one spawned loop per job id, tracked in a cancellable registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bookforge_client::BackendApi;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::PollPolicy;
use super::types::{JobReconciler, PollEvent, PollOutcome, PollTarget, PollUpdate};
use crate::error::PollError;

struct ActivePoll {
    target: PollTarget,
    cancel: CancellationToken,
    generation: u64,
    /// Status requests issued, shared with the loop.
    attempts: Arc<AtomicU32>,
}

struct PollerInner {
    api: Arc<dyn BackendApi>,
    policy: PollPolicy,
    active: Mutex<HashMap<String, ActivePoll>>,
    next_generation: AtomicU64,
    updates: broadcast::Sender<PollUpdate>,
}

impl PollerInner {
    fn active(&self) -> MutexGuard<'_, HashMap<String, ActivePoll>> {
        // Entries stay consistent even if a holder panicked; keep going.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the entry for `job_id` if it still belongs to this loop.
    fn deregister(&self, job_id: &str, generation: u64) -> bool {
        let mut active = self.active();
        match active.get(job_id) {
            Some(entry) if entry.generation == generation => {
                active.remove(job_id);
                true
            }
            _ => false,
        }
    }

    fn publish(&self, target: &PollTarget, attempt: u32, event: PollEvent) {
        // No subscribers is fine.
        let _ = self.updates.send(PollUpdate {
            job_id: target.job_id.clone(),
            entity_id: target.entity_id.clone(),
            project_id: target.project_id.clone(),
            attempt,
            event,
        });
    }
}

/// Polls job status until a terminal state, then reconciles exactly once.
///
/// Cheap to clone; clones share the registry. Loops run on the current
/// tokio runtime.
#[derive(Clone)]
pub struct JobPoller {
    inner: Arc<PollerInner>,
}

impl JobPoller {
    /// A zero interval in `policy` is raised to the minimum.
    pub fn new(api: Arc<dyn BackendApi>, policy: PollPolicy) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(PollerInner {
                api,
                policy: policy.clamped(),
                active: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                updates,
            }),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.inner.policy
    }

    /// Start polling `target.job_id`.
    ///
    /// The caller has already marked `target.entity_id` as processing.
    /// Returns `Ok(false)` without arming a second loop when the job is
    /// already being polled.
    pub fn start_polling(
        &self,
        target: PollTarget,
        reconciler: Arc<dyn JobReconciler>,
    ) -> Result<bool, PollError> {
        if target.job_id.trim().is_empty() {
            return Err(PollError::EmptyJobId);
        }

        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        {
            let mut active = self.inner.active();
            if active.contains_key(&target.job_id) {
                warn!(job_id = %target.job_id, "job is already being polled; ignoring second start");
                return Ok(false);
            }
            active.insert(
                target.job_id.clone(),
                ActivePoll {
                    target: target.clone(),
                    cancel: cancel.clone(),
                    generation,
                    attempts: Arc::clone(&attempts),
                },
            );
        }

        info!(
            job_id = %target.job_id,
            entity_id = %target.entity_id,
            project_id = %target.project_id,
            "polling job"
        );
        tokio::spawn(run_poll(
            Arc::clone(&self.inner),
            target,
            generation,
            cancel,
            attempts,
            reconciler,
        ));
        Ok(true)
    }

    /// Stop polling `job_id`. Unknown or finished ids are a no-op.
    ///
    /// The processing marker is left alone.
    pub fn cancel_polling(&self, job_id: &str) -> bool {
        let removed = self.inner.active().remove(job_id);
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                let attempts = entry.attempts.load(Ordering::Acquire);
                info!(job_id, entity_id = %entry.target.entity_id, attempts, "polling cancelled");
                self.inner.publish(
                    &entry.target,
                    attempts,
                    PollEvent::Finished(PollOutcome::Cancelled),
                );
                true
            }
            None => {
                debug!(job_id, "cancel requested for a job that is not being polled");
                false
            }
        }
    }

    /// Cancel every active poll. Returns how many were stopped.
    pub fn cancel_all(&self) -> usize {
        let job_ids = self.active_jobs();
        job_ids
            .iter()
            .filter(|job_id| self.cancel_polling(job_id))
            .count()
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        self.inner.active().contains_key(job_id)
    }

    /// Job ids with a running loop, sorted.
    pub fn active_jobs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.active().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Subscribe to status observations and outcomes of every poll.
    pub fn subscribe(&self) -> broadcast::Receiver<PollUpdate> {
        self.inner.updates.subscribe()
    }
}

async fn run_poll(
    inner: Arc<PollerInner>,
    target: PollTarget,
    generation: u64,
    cancel: CancellationToken,
    issued: Arc<AtomicU32>,
    reconciler: Arc<dyn JobReconciler>,
) {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    let outcome = loop {
        let delay = inner.policy.delay_for(attempts);
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        attempts += 1;
        issued.store(attempts, Ordering::Release);
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = inner.api.job_status(&target.job_id) => result,
        };

        match result {
            Err(e) => {
                warn!(job_id = %target.job_id, attempt = attempts, error = %e, "job status request failed");
                break PollOutcome::RequestFailed {
                    message: format!("Failed to check status for job {}: {e}", target.job_id),
                };
            }
            Ok(report) => {
                debug!(job_id = %target.job_id, attempt = attempts, status = %report.status, "job status");
                inner.publish(&target, attempts, PollEvent::Status(report.status.clone()));

                if report.status.is_success() {
                    break PollOutcome::Succeeded;
                }
                if report.status.is_failure() {
                    let detail = report
                        .error
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| "Unknown error".to_string());
                    break PollOutcome::Failed {
                        message: format!("Job {} failed. Error: {detail}", target.job_id),
                    };
                }
                if inner.policy.exhausted(attempts, started.elapsed()) {
                    break PollOutcome::TimedOut { attempts };
                }
            }
        }
    };

    // A cancel that raced the last request wins; nothing to reconcile.
    if !inner.deregister(&target.job_id, generation) {
        debug!(job_id = %target.job_id, "poll finished after cancellation; skipping reconciliation");
        return;
    }

    reconciler.clear_processing(&target.entity_id);
    match &outcome {
        PollOutcome::Succeeded => {
            info!(job_id = %target.job_id, attempts, "job completed");
            reconciler.job_succeeded(&target);
            reconciler.refresh_project(&target.project_id).await;
        }
        PollOutcome::Failed { message } | PollOutcome::RequestFailed { message } => {
            warn!(job_id = %target.job_id, attempts, %message, "job did not complete");
            reconciler.record_error(message.clone());
        }
        PollOutcome::TimedOut { attempts } => {
            warn!(job_id = %target.job_id, attempts, "gave up polling job");
            reconciler.record_error(format!(
                "Timed out waiting for job {} after {attempts} status checks.",
                target.job_id
            ));
        }
        PollOutcome::Cancelled => {}
    }

    inner.publish(&target, attempts, PollEvent::Finished(outcome));
}
