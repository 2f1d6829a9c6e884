// crates/core/src/context.rs
//! One explicitly constructed bundle of client, poller and stores per session.

use std::sync::Arc;

use bookforge_client::{ApiError, BackendApi, HttpClient};
use tracing::info;

use crate::config::AppConfig;
use crate::feedback::FeedbackStore;
use crate::poller::JobPoller;
use crate::store::{AgentStore, ProjectStore};

/// Shared handles for one session. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub api: Arc<dyn BackendApi>,
    pub poller: JobPoller,
    pub feedback: FeedbackStore,
    pub projects: ProjectStore,
    pub agents: AgentStore,
}

impl AppContext {
    /// Build the HTTP client from `config.api` and wire everything to it.
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let client = HttpClient::new(&config.api)?;
        info!(base_url = %client.base_url(), "backend client ready");
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Wire the stores to an existing backend.
    pub fn with_api(config: AppConfig, api: Arc<dyn BackendApi>) -> Self {
        let poller = JobPoller::new(Arc::clone(&api), config.polling.clone());
        let feedback = FeedbackStore::new(config.notifications.default_duration());
        let projects = ProjectStore::new(Arc::clone(&api), poller.clone(), Some(feedback.clone()));
        let agents = AgentStore::new(Arc::clone(&api));
        Self {
            config,
            api,
            poller,
            feedback,
            projects,
            agents,
        }
    }

    /// Stop every running poll.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.poller.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "cancelled active polls");
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;
    use bookforge_client::ClientConfig;

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = AppConfig {
            api: ClientConfig::new("not a url"),
            ..AppConfig::default()
        };
        assert!(matches!(
            AppContext::new(config),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stores_share_one_poller() {
        let api = Arc::new(FakeBackend::new());
        api.insert_project(crate::test_support::project("proj-1"));
        let ctx = AppContext::with_api(AppConfig::default(), api.clone());

        let started = ctx.projects.generate_parts("proj-1").await;
        let job_id = started.job_id().unwrap().to_string();
        assert!(ctx.poller.is_polling(&job_id));

        assert_eq!(ctx.shutdown(), 1);
        assert!(ctx.poller.active_jobs().is_empty());
        assert!(ctx.projects.is_processing("proj-1"));
    }
}
