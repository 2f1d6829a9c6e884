// crates/client/src/error.rs
use thiserror::Error;

/// Errors raised by the HTTP client adapter.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    /// HTTP status code, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures where no HTTP response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Request { .. })
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI errors carry `{"detail": ...}`; some handlers use `{"error": ...}`.
/// Falls back to the raw body, then to a generic message.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
