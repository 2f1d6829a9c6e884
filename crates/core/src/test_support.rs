// crates/core/src/test_support.rs
//! Scripted backend and recording reconciler for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bookforge_client::{ApiError, BackendApi};
use bookforge_types::{
    Chapter, ChapterReview, FinalizeBookRequest, FinalizeChaptersRequest, FinalizePartsRequest,
    HealthStatus, JobHandle, JobStatusReport, Part, Project, TransitionAnalysis,
};

use crate::poller::JobReconciler;

type RequestHook = Arc<dyn Fn(&str) + Send + Sync>;

/// In-memory `BackendApi` with scripted responses and a call log.
///
/// Calls are logged as `"METHOD /path"` at the moment the request is made.
/// Status requests answer from the job's own script first, then the shared
/// one, then `queued`. Unscripted generation starts answer `job-N`.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    statuses: Mutex<VecDeque<Result<JobStatusReport, ApiError>>>,
    job_statuses: Mutex<HashMap<String, VecDeque<Result<JobStatusReport, ApiError>>>>,
    starts: Mutex<VecDeque<Result<JobHandle, ApiError>>>,
    projects: Mutex<HashMap<String, Project>>,
    delayed_projects: Mutex<VecDeque<(Duration, Project)>>,
    agents: Mutex<Vec<String>>,
    analysis: Mutex<Option<TransitionAnalysis>>,
    failing: Mutex<HashSet<String>>,
    on_request: Mutex<Option<RequestHook>>,
    next_job: AtomicU64,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(path: &str) -> ApiError {
        ApiError::Status {
            path: path.to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        }
    }

    pub fn push_status(&self, status: Result<JobStatusReport, ApiError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// Script a status answer for one job only.
    pub fn push_status_for(&self, job_id: &str, status: Result<JobStatusReport, ApiError>) {
        self.job_statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(status);
    }

    pub fn push_start(&self, start: Result<JobHandle, ApiError>) {
        self.starts.lock().unwrap().push_back(start);
    }

    pub fn insert_project(&self, project: Project) {
        self.projects
            .lock()
            .unwrap()
            .insert(project.id.clone(), project);
    }

    /// The next `get_project` call sleeps for `delay` and returns `project`.
    pub fn push_delayed_project(&self, delay: Duration, project: Project) {
        self.delayed_projects
            .lock()
            .unwrap()
            .push_back((delay, project));
    }

    pub fn set_agents(&self, names: &[&str]) {
        *self.agents.lock().unwrap() = names.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_analysis(&self, analysis: TransitionAnalysis) {
        *self.analysis.lock().unwrap() = Some(analysis);
    }

    /// Make every call with this label fail with HTTP 503.
    pub fn fail(&self, label: &str) {
        self.failing.lock().unwrap().insert(label.to_string());
    }

    /// Run `hook` with the call label whenever a request is made.
    pub fn on_request(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_request.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == label).count()
    }

    fn record(&self, label: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(label.clone());
        let hook = self.on_request.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(&label);
        }
        if self.failing.lock().unwrap().contains(&label) {
            let path = label.split_once(' ').map(|(_, p)| p).unwrap_or(label.as_str());
            return Err(Self::unavailable(path));
        }
        Ok(())
    }

    fn next_start(&self) -> Result<JobHandle, ApiError> {
        match self.starts.lock().unwrap().pop_front() {
            Some(start) => start,
            None => Ok(JobHandle::new(self.next_job_id())),
        }
    }

    fn next_job_id(&self) -> String {
        format!("job-{}", self.next_job.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn stored_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.projects
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                path: format!("/projects/{project_id}"),
                status: 404,
                message: "Project not found".to_string(),
            })
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.record("GET /".to_string())?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            version: Some("test".to_string()),
        })
    }

    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.record("GET /projects".to_string())?;
        let mut projects: Vec<Project> = self.projects.lock().unwrap().values().cloned().collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.record(format!("GET /projects/{project_id}"))?;
        let delayed = self.delayed_projects.lock().unwrap().pop_front();
        if let Some((delay, project)) = delayed {
            tokio::time::sleep(delay).await;
            return Ok(project);
        }
        self.stored_project(project_id)
    }

    async fn create_project(&self, raw_blueprint: &str) -> Result<Project, ApiError> {
        self.record("POST /projects".to_string())?;
        let mut created = project("proj-new");
        created.raw_blueprint = raw_blueprint.to_string();
        self.insert_project(created.clone());
        Ok(created)
    }

    async fn generate_parts(&self, project_id: &str) -> Result<JobHandle, ApiError> {
        self.record(format!("POST /crew/generate-parts/{project_id}"))?;
        self.next_start()
    }

    async fn finalize_parts(
        &self,
        project_id: &str,
        _body: &FinalizePartsRequest,
    ) -> Result<Project, ApiError> {
        self.record(format!("PUT /projects/{project_id}/finalize-parts"))?;
        self.stored_project(project_id)
    }

    async fn generate_chapters(&self, part_id: &str) -> Result<JobHandle, ApiError> {
        self.record(format!("POST /crew/generate-chapters/{part_id}"))?;
        self.next_start()
    }

    async fn finalize_chapters(
        &self,
        part_id: &str,
        body: &FinalizeChaptersRequest,
    ) -> Result<Part, ApiError> {
        self.record(format!("PUT /parts/{part_id}/finalize-chapters"))?;
        Ok(Part {
            id: part_id.to_string(),
            part_number: 1,
            title: "Part".to_string(),
            summary: None,
            chapters: body
                .chapters
                .iter()
                .map(|c| Chapter {
                    id: format!("{part_id}-ch-{}", c.chapter_number),
                    chapter_number: c.chapter_number,
                    title: c.title.clone(),
                    status: Some("BRIEF_READY".to_string()),
                    brief: Some(c.brief.clone()),
                    suggested_agent: Some(c.suggested_agent.clone()),
                })
                .collect(),
        })
    }

    async fn generate_chapter_content(&self, chapter_id: &str) -> Result<JobHandle, ApiError> {
        self.record(format!("POST /chapters/{chapter_id}/generate"))?;
        self.next_start()
    }

    async fn analyze_transition(&self, chapter_id: &str) -> Result<TransitionAnalysis, ApiError> {
        self.record(format!("POST /chapters/{chapter_id}/analyze-transition"))?;
        let scripted = self.analysis.lock().unwrap().clone();
        Ok(scripted.unwrap_or_else(|| {
            TransitionAnalysis(serde_json::json!({"job_id": self.next_job_id(), "status": "queued"}))
        }))
    }

    async fn review_chapter(
        &self,
        chapter_id: &str,
        review: &ChapterReview,
    ) -> Result<Chapter, ApiError> {
        self.record(format!("PUT /chapters/{chapter_id}/review"))?;
        Ok(Chapter {
            id: chapter_id.to_string(),
            chapter_number: 1,
            title: "Chapter".to_string(),
            status: Some(review.new_status.clone()),
            brief: None,
            suggested_agent: None,
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusReport, ApiError> {
        self.record(format!("GET /crew/status/{job_id}"))?;
        let scripted = self
            .job_statuses
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);
        if let Some(status) = scripted {
            return status;
        }
        match self.statuses.lock().unwrap().pop_front() {
            Some(status) => status,
            None => Ok(JobStatusReport::new("queued")),
        }
    }

    async fn agent_names(&self) -> Result<Vec<String>, ApiError> {
        self.record("GET /crew/agents".to_string())?;
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn finalize_book(
        &self,
        project_id: &str,
        _body: &FinalizeBookRequest,
    ) -> Result<Project, ApiError> {
        self.record(format!("POST /projects/{project_id}/finalize"))?;
        self.stored_project(project_id)
    }
}

/// A project summary with no parts.
pub fn project(id: &str) -> Project {
    Project {
        id: id.to_string(),
        raw_blueprint: format!("Blueprint for {id}"),
        status: Some("DRAFT".to_string()),
        total_cost: Some("0.00".to_string()),
        structured_outline: None,
        parts: Vec::new(),
    }
}

/// A project with one part holding one chapter.
pub fn project_with_part(id: &str, part_id: &str, chapter_id: &str) -> Project {
    let mut p = project(id);
    p.parts.push(Part {
        id: part_id.to_string(),
        part_number: 1,
        title: "Origins".to_string(),
        summary: Some("Where it started".to_string()),
        chapters: vec![Chapter {
            id: chapter_id.to_string(),
            chapter_number: 1,
            title: "Leaves".to_string(),
            status: Some("BRIEF_READY".to_string()),
            brief: None,
            suggested_agent: Some("historian".to_string()),
        }],
    });
    p
}

/// Reconciler that records every call.
#[derive(Default)]
pub struct RecordingReconciler {
    cleared: Mutex<Vec<String>>,
    refreshed: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingReconciler {
    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobReconciler for RecordingReconciler {
    fn clear_processing(&self, entity_id: &str) {
        self.cleared.lock().unwrap().push(entity_id.to_string());
    }

    async fn refresh_project(&self, project_id: &str) {
        self.refreshed.lock().unwrap().push(project_id.to_string());
    }

    fn record_error(&self, message: String) {
        self.errors.lock().unwrap().push(message);
    }
}
