// crates/core/src/store/mod.rs
pub mod agent;
pub mod project;

pub use agent::AgentStore;
pub use project::{GenerationStart, ProjectStore};
