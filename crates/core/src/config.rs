// crates/core/src/config.rs
//! Application configuration: defaults, then an optional TOML file, then
//! environment variables. Command-line flags are applied by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bookforge_client::ClientConfig;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::feedback::DEFAULT_NOTIFICATION_MS;
use crate::poller::PollPolicy;

/// Environment variable naming the config file when none is passed.
pub const CONFIG_PATH_VAR: &str = "BOOKFORGE_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub default_duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_NOTIFICATION_MS,
        }
    }
}

impl NotificationConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Everything an [`AppContext`](crate::AppContext) is built from.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ClientConfig,
    pub polling: PollPolicy,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Load from `path`, or from `$BOOKFORGE_CONFIG` when `path` is `None`,
    /// then overlay the environment. No file at all means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with(
        path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| var(CONFIG_PATH_VAR).filter(|v| !v.is_empty()).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                let config = Self::from_toml_str(&text)
                    .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
                config.validate()?;
                debug!(path = %path.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };
        config.apply_vars(&var);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "polling.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn apply_vars(&mut self, var: &impl Fn(&str) -> Option<String>) {
        self.api.apply_vars(var);
        match var("BOOKFORGE_POLL_INTERVAL_MS").map(|v| v.parse::<u64>()) {
            Some(Ok(ms)) if ms > 0 => self.polling.interval_ms = ms,
            Some(Ok(_)) => warn!("ignoring zero BOOKFORGE_POLL_INTERVAL_MS"),
            Some(Err(e)) => warn!(error = %e, "ignoring invalid BOOKFORGE_POLL_INTERVAL_MS"),
            None => {}
        }
    }
}
