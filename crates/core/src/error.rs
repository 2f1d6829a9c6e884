// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when arming a job poll.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Cannot poll a job without an id")]
    EmptyJobId,
}

/// Errors that complete a pending confirmation without an answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("Confirmation dismissed{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    Dismissed { reason: Option<String> },

    #[error("Confirmation abandoned: feedback store was dropped")]
    Abandoned,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_error_display() {
        let err = FeedbackError::Dismissed { reason: None };
        assert_eq!(err.to_string(), "Confirmation dismissed");

        let err = FeedbackError::Dismissed {
            reason: Some("navigated away".to_string()),
        };
        assert_eq!(err.to_string(), "Confirmation dismissed: navigated away");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            key: "polling.interval_ms",
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid config value polling.interval_ms: must be greater than zero"
        );
    }

    #[test]
    fn test_poll_error_display() {
        assert_eq!(PollError::EmptyJobId.to_string(), "Cannot poll a job without an id");
    }
}
