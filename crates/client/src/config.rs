// crates/client/src/config.rs
//! Connection settings for the backend API.

use std::time::Duration;

use serde::Deserialize;

/// Default backend address (the API server's development port).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Per-request timeout. None = rely on the transport defaults.
    pub timeout_secs: Option<u64>,
    /// Sent as a bearer token when set. The backend does not check it today.
    pub api_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            api_token: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Overlay `BOOKFORGE_API_URL`, `BOOKFORGE_API_TOKEN` and
    /// `BOOKFORGE_TIMEOUT_SECS` when they are set.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// [`apply_env`](Self::apply_env) with a custom variable lookup.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("BOOKFORGE_API_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(token) = var("BOOKFORGE_API_TOKEN").filter(|v| !v.is_empty()) {
            self.api_token = Some(token);
        }
        match var("BOOKFORGE_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) => self.timeout_secs = Some(secs),
            Some(Err(e)) => tracing::warn!(error = %e, "ignoring invalid BOOKFORGE_TIMEOUT_SECS"),
            None => {}
        }
    }
}
