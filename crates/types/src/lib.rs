// crates/types/src/lib.rs
//! Wire types shared by the bookforge HTTP client and the client-side stores.

pub mod job;
pub mod project;

pub use job::*;
pub use project::*;

use serde::{Deserialize, Serialize};

/// Response body of `GET /`, the backend root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
