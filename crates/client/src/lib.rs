// crates/client/src/lib.rs
//! HTTP client adapter for the bookforge backend.
//!
//! Transport only: every method maps to one REST call against the configured
//! base URL. State and retries live in `bookforge-core`.

pub mod api;
pub mod config;
pub mod error;
pub mod http;

pub use api::BackendApi;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::HttpClient;
