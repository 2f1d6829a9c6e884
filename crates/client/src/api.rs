// crates/client/src/api.rs
//! `BackendApi` trait: the REST surface the stores and the poller depend on.

use async_trait::async_trait;
use bookforge_types::{
    Chapter, ChapterReview, FinalizeBookRequest, FinalizeChaptersRequest, FinalizePartsRequest,
    HealthStatus, JobHandle, JobStatusReport, Part, Project, TransitionAnalysis,
};

use crate::error::ApiError;

/// The backend REST surface.
///
/// Implementations include:
/// - `HttpClient`: reqwest against a configured base URL
/// - test doubles that script responses
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /`: service status and version.
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    /// `GET /projects`
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    /// `GET /projects/{id}` with parts and chapters.
    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError>;

    /// `POST /projects`
    async fn create_project(&self, raw_blueprint: &str) -> Result<Project, ApiError>;

    /// `POST /crew/generate-parts/{project_id}`
    async fn generate_parts(&self, project_id: &str) -> Result<JobHandle, ApiError>;

    /// `PUT /projects/{id}/finalize-parts`
    async fn finalize_parts(
        &self,
        project_id: &str,
        body: &FinalizePartsRequest,
    ) -> Result<Project, ApiError>;

    /// `POST /crew/generate-chapters/{part_id}`
    async fn generate_chapters(&self, part_id: &str) -> Result<JobHandle, ApiError>;

    /// `PUT /parts/{part_id}/finalize-chapters`
    async fn finalize_chapters(
        &self,
        part_id: &str,
        body: &FinalizeChaptersRequest,
    ) -> Result<Part, ApiError>;

    /// `POST /chapters/{chapter_id}/generate`
    async fn generate_chapter_content(&self, chapter_id: &str) -> Result<JobHandle, ApiError>;

    /// `POST /chapters/{chapter_id}/analyze-transition`
    async fn analyze_transition(&self, chapter_id: &str) -> Result<TransitionAnalysis, ApiError>;

    /// `PUT /chapters/{chapter_id}/review`
    async fn review_chapter(
        &self,
        chapter_id: &str,
        review: &ChapterReview,
    ) -> Result<Chapter, ApiError>;

    /// `GET /crew/status/{job_id}`
    async fn job_status(&self, job_id: &str) -> Result<JobStatusReport, ApiError>;

    /// `GET /crew/agents`
    async fn agent_names(&self) -> Result<Vec<String>, ApiError>;

    /// `POST /projects/{id}/finalize`
    async fn finalize_book(
        &self,
        project_id: &str,
        body: &FinalizeBookRequest,
    ) -> Result<Project, ApiError>;
}
