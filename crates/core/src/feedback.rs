// crates/core/src/feedback.rs
//! Transient user feedback: toast notifications, a global loading flag and a
//! queue of confirmation dialogs.
//!
//! Confirmations are answered in arrival order. Each request gets its own
//! completion channel, so a second request waits behind the first instead of
//! replacing it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use crate::error::FeedbackError;

pub const DEFAULT_NOTIFICATION_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    /// Zero means the notification stays until dismissed.
    pub duration: Duration,
}

/// Text of a confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub title: String,
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
}

impl ConfirmationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }

    pub fn with_confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = text.into();
        self
    }

    pub fn with_cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }
}

/// The dialog currently shown: the front of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConfirmation {
    pub id: Uuid,
    pub request: ConfirmationRequest,
}

type Answer = Result<bool, FeedbackError>;

/// Caller side of a queued confirmation.
#[derive(Debug)]
pub struct PendingConfirmation {
    id: Uuid,
    rx: oneshot::Receiver<Answer>,
}

impl PendingConfirmation {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the user's answer. `Ok(true)` confirmed, `Ok(false)` cancelled.
    pub async fn wait(self) -> Result<bool, FeedbackError> {
        self.rx.await.unwrap_or(Err(FeedbackError::Abandoned))
    }
}

struct QueuedConfirmation {
    id: Uuid,
    request: ConfirmationRequest,
    tx: oneshot::Sender<Answer>,
}

#[derive(Default)]
struct FeedbackState {
    notifications: Vec<Notification>,
    global_loading: bool,
    confirmations: VecDeque<QueuedConfirmation>,
}

struct FeedbackInner {
    state: Mutex<FeedbackState>,
    default_duration: Duration,
}

impl FeedbackInner {
    fn state(&self) -> MutexGuard<'_, FeedbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_notification(&self, id: Uuid) -> bool {
        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        state.notifications.len() != before
    }
}

/// Shared feedback state. Clones share the same queues.
#[derive(Clone)]
pub struct FeedbackStore {
    inner: Arc<FeedbackInner>,
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_NOTIFICATION_MS))
    }
}

impl FeedbackStore {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            inner: Arc::new(FeedbackInner {
                state: Mutex::new(FeedbackState::default()),
                default_duration,
            }),
        }
    }

    pub fn default_duration(&self) -> Duration {
        self.inner.default_duration
    }

    /// Append a notification and return its id.
    ///
    /// `None` uses the default duration. A non-zero duration schedules
    /// removal on the current tokio runtime; outside a runtime the
    /// notification stays until dismissed.
    pub fn notify(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let duration = duration.unwrap_or(self.inner.default_duration);
        let message = message.into();
        debug!(%id, %kind, %message, "notification");
        self.inner.state().notifications.push(Notification {
            id,
            kind,
            message,
            duration,
        });

        if !duration.is_zero() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let weak: Weak<FeedbackInner> = Arc::downgrade(&self.inner);
                    handle.spawn(async move {
                        tokio::time::sleep(duration).await;
                        if let Some(inner) = weak.upgrade() {
                            inner.remove_notification(id);
                        }
                    });
                }
                Err(_) => debug!(%id, "no runtime; notification stays until dismissed"),
            }
        }
        id
    }

    pub fn show_success(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Success, message, None)
    }

    pub fn show_error(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Error, message, None)
    }

    pub fn show_info(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Info, message, None)
    }

    pub fn show_warning(&self, message: impl Into<String>) -> Uuid {
        self.notify(NotificationKind::Warning, message, None)
    }

    /// Remove a notification. Unknown ids are ignored.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.inner.remove_notification(id)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.state().notifications.clone()
    }

    pub fn set_global_loading(&self, loading: bool) {
        self.inner.state().global_loading = loading;
    }

    pub fn is_global_loading(&self) -> bool {
        self.inner.state().global_loading
    }

    /// Queue a confirmation dialog.
    pub fn request_confirmation(&self, request: ConfirmationRequest) -> PendingConfirmation {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        let mut state = self.inner.state();
        state
            .confirmations
            .push_back(QueuedConfirmation { id, request, tx });
        debug!(%id, queued = state.confirmations.len(), "confirmation requested");
        PendingConfirmation { id, rx }
    }

    /// Queue a confirmation and wait for its answer.
    pub async fn confirm(&self, request: ConfirmationRequest) -> Result<bool, FeedbackError> {
        self.request_confirmation(request).wait().await
    }

    pub fn active_confirmation(&self) -> Option<ActiveConfirmation> {
        self.inner
            .state()
            .confirmations
            .front()
            .map(|c| ActiveConfirmation {
                id: c.id,
                request: c.request.clone(),
            })
    }

    pub fn pending_confirmations(&self) -> usize {
        self.inner.state().confirmations.len()
    }

    /// Answer the active dialog. Returns false when nothing is queued.
    pub fn resolve_confirmation(&self, confirmed: bool) -> bool {
        self.complete_front(Ok(confirmed))
    }

    /// Dismiss the active dialog without an answer.
    pub fn reject_confirmation(&self, reason: Option<String>) -> bool {
        self.complete_front(Err(FeedbackError::Dismissed { reason }))
    }

    fn complete_front(&self, answer: Answer) -> bool {
        let front = self.inner.state().confirmations.pop_front();
        match front {
            Some(entry) => {
                debug!(id = %entry.id, ?answer, "confirmation completed");
                // The waiter may have given up; nothing to do then.
                let _ = entry.tx.send(answer);
                true
            }
            None => false,
        }
    }
}
