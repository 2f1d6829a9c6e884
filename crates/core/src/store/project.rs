// crates/core/src/store/project.rs
//! Client-side cache of projects plus the actions that start, finalize and
//! review generation work.
//!
//! The store owns the processing markers: an id is marked before a
//! generation request is sent and released when its job ends or the start is
//! rejected. Markers are counted, so an id stays processing while any of its
//! jobs is still in flight. Job completion is reconciled through
//! [`JobReconciler`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bookforge_client::{ApiError, BackendApi};
use bookforge_types::{
    Chapter, ChapterOutline, ChapterReview, FinalizeBookRequest, FinalizeChaptersRequest,
    FinalizePartsRequest, FinalizeTask, JobHandle, PartOutline, Project, TransitionAnalysis,
};
use tracing::{debug, info, warn};

use crate::feedback::FeedbackStore;
use crate::poller::{JobPoller, JobReconciler, PollTarget};

/// Result of a generation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStart {
    /// The backend accepted the job and a poll is running.
    Started { job_id: String },
    /// The backend answered inline; nothing to poll.
    Completed,
    /// No active project to attach the work to. No request was sent.
    Skipped,
    /// The start request failed. The marker was removed.
    Rejected { message: String },
}

impl GenerationStart {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            GenerationStart::Started { job_id } => Some(job_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Generation {
    Parts,
    Chapters,
    ChapterContent,
    TransitionAnalysis,
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Generation::Parts => "part generation",
            Generation::Chapters => "chapter generation",
            Generation::ChapterContent => "content generation",
            Generation::TransitionAnalysis => "transition analysis",
        };
        f.write_str(s)
    }
}

#[derive(Default)]
struct ProjectState {
    projects: Vec<Project>,
    active_project: Option<Project>,
    /// Jobs in flight per entity id. Ids are removed at zero.
    processing_ids: HashMap<String, usize>,
    error: Option<String>,
    loading: usize,
    /// Highest list fetch sequence whose response was applied.
    list_applied: u64,
    /// Highest detail fetch sequence whose response was applied.
    detail_applied: u64,
    transition_analyses: HashMap<String, TransitionAnalysis>,
}

impl ProjectState {
    fn release(&mut self, id: &str) {
        if let Some(count) = self.processing_ids.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.processing_ids.remove(id);
            }
        }
    }
}

struct ProjectStoreInner {
    api: Arc<dyn BackendApi>,
    poller: JobPoller,
    feedback: Option<FeedbackStore>,
    state: RwLock<ProjectState>,
    list_seq: AtomicU64,
    detail_seq: AtomicU64,
}

/// Decrements the loading depth when dropped.
struct LoadingGuard<'a> {
    inner: &'a ProjectStoreInner,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.write();
        state.loading = state.loading.saturating_sub(1);
    }
}

impl ProjectStoreInner {
    fn read(&self) -> RwLockReadGuard<'_, ProjectState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProjectState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.write().loading += 1;
        LoadingGuard { inner: self }
    }
}

/// Project cache and generation actions. Clones share state.
#[derive(Clone)]
pub struct ProjectStore {
    inner: Arc<ProjectStoreInner>,
}

impl ProjectStore {
    pub fn new(api: Arc<dyn BackendApi>, poller: JobPoller, feedback: Option<FeedbackStore>) -> Self {
        Self {
            inner: Arc::new(ProjectStoreInner {
                api,
                poller,
                feedback,
                state: RwLock::new(ProjectState::default()),
                list_seq: AtomicU64::new(0),
                detail_seq: AtomicU64::new(0),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Fetches
    // -----------------------------------------------------------------------

    /// Replace the project list. Failures land in [`error`](Self::error).
    pub async fn fetch_projects(&self) {
        let seq = self.inner.list_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _loading = self.inner.begin_loading();
        self.inner.write().error = None;

        let result = self.inner.api.list_projects().await;

        let mut state = self.inner.write();
        if seq < state.list_applied {
            debug!(seq, applied = state.list_applied, "discarding stale project list");
            return;
        }
        state.list_applied = seq;
        match result {
            Ok(projects) => {
                debug!(count = projects.len(), "project list loaded");
                state.projects = projects;
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch projects");
                state.error = Some(format!("Failed to fetch projects: {e}"));
            }
        }
    }

    /// Replace the active project with the backend's current detail.
    pub async fn fetch_project_by_id(&self, project_id: &str) {
        let seq = self.inner.detail_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let _loading = self.inner.begin_loading();
        self.inner.write().error = None;

        let result = self.inner.api.get_project(project_id).await;

        let mut state = self.inner.write();
        if seq < state.detail_applied {
            debug!(project_id, seq, applied = state.detail_applied, "discarding stale project detail");
            return;
        }
        state.detail_applied = seq;
        match result {
            Ok(project) => {
                debug!(project_id, parts = project.parts.len(), "project loaded");
                state.active_project = Some(project);
            }
            Err(e) => {
                warn!(project_id, error = %e, "failed to fetch project");
                state.error = Some(format!("Failed to fetch project {project_id}: {e}"));
            }
        }
    }

    /// Create a project from a blueprint, then refresh the list.
    pub async fn create_project(&self, raw_blueprint: &str) -> Result<Project, ApiError> {
        let _loading = self.inner.begin_loading();
        self.inner.write().error = None;
        match self.inner.api.create_project(raw_blueprint).await {
            Ok(project) => {
                info!(project_id = %project.id, "project created");
                self.fetch_projects().await;
                Ok(project)
            }
            Err(e) => {
                self.report_error(format!("Failed to create project: {e}"));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Start outlining the parts of `project_id`.
    pub async fn generate_parts(&self, project_id: &str) -> GenerationStart {
        self.mark_processing(project_id);
        let result = self.inner.api.generate_parts(project_id).await;
        self.arm(Generation::Parts, result, project_id, project_id.to_string())
    }

    /// Start outlining the chapters of a part of the active project.
    pub async fn generate_chapters(&self, part_id: &str) -> GenerationStart {
        let Some(project_id) = self.active_project_id() else {
            warn!(part_id, "no active project; not generating chapters");
            return GenerationStart::Skipped;
        };
        self.mark_processing(part_id);
        let result = self.inner.api.generate_chapters(part_id).await;
        self.arm(Generation::Chapters, result, part_id, project_id)
    }

    /// Start writing the content of a chapter of the active project.
    pub async fn generate_chapter_content(&self, chapter_id: &str) -> GenerationStart {
        let Some(project_id) = self.active_project_id() else {
            warn!(chapter_id, "no active project; not generating chapter content");
            return GenerationStart::Skipped;
        };
        self.mark_processing(chapter_id);
        let result = self.inner.api.generate_chapter_content(chapter_id).await;
        self.arm(Generation::ChapterContent, result, chapter_id, project_id)
    }

    /// Analyze how a chapter hands off to the next one.
    ///
    /// Polls when the backend enqueues a job. An inline answer is kept under
    /// [`transition_analysis`](Self::transition_analysis) and the active
    /// project is refreshed.
    pub async fn analyze_transition(&self, chapter_id: &str) -> GenerationStart {
        let Some(project_id) = self.active_project_id() else {
            warn!(chapter_id, "no active project; not analyzing transition");
            return GenerationStart::Skipped;
        };
        self.mark_processing(chapter_id);
        let analysis = match self.inner.api.analyze_transition(chapter_id).await {
            Ok(analysis) => analysis,
            Err(e) => return self.reject(Generation::TransitionAnalysis, chapter_id, e.to_string()),
        };

        if let Some(handle) = analysis.job_handle() {
            return self.arm(Generation::TransitionAnalysis, Ok(handle), chapter_id, project_id);
        }

        info!(chapter_id, "transition analysis returned inline");
        {
            let mut state = self.inner.write();
            state
                .transition_analyses
                .insert(chapter_id.to_string(), analysis);
            state.release(chapter_id);
        }
        self.fetch_project_by_id(&project_id).await;
        GenerationStart::Completed
    }

    fn arm(
        &self,
        kind: Generation,
        started: Result<JobHandle, ApiError>,
        target_id: &str,
        project_id: String,
    ) -> GenerationStart {
        let handle = match started {
            Ok(handle) => handle,
            Err(e) => return self.reject(kind, target_id, e.to_string()),
        };

        let job_id = handle.job_id;
        let target = PollTarget::new(job_id.clone(), target_id, project_id);
        let reconciler: Arc<dyn JobReconciler> = Arc::new(self.clone());
        match self.inner.poller.start_polling(target, reconciler) {
            Ok(true) => {
                info!(%job_id, entity_id = target_id, "{kind} started");
                GenerationStart::Started { job_id }
            }
            Ok(false) => {
                // The running loop releases its own mark; drop this one.
                self.inner.write().release(target_id);
                GenerationStart::Started { job_id }
            }
            Err(e) => self.reject(kind, target_id, e.to_string()),
        }
    }

    fn reject(&self, kind: Generation, target_id: &str, reason: String) -> GenerationStart {
        self.inner.write().release(target_id);
        let message = format!("Failed to start {kind} for {target_id}: {reason}");
        warn!(entity_id = target_id, %reason, "{kind} rejected");
        self.report_error(message.clone());
        GenerationStart::Rejected { message }
    }

    /// Stop polling a job. The processing marker is left as is.
    pub fn cancel_polling(&self, job_id: &str) -> bool {
        self.inner.poller.cancel_polling(job_id)
    }

    // -----------------------------------------------------------------------
    // Finalize and review
    // -----------------------------------------------------------------------

    /// Replace the part outline of a project, then refetch it.
    pub async fn finalize_parts(
        &self,
        project_id: &str,
        parts: Vec<PartOutline>,
    ) -> Result<(), ApiError> {
        let _loading = self.inner.begin_loading();
        let body = FinalizePartsRequest { parts };
        if let Err(e) = self.inner.api.finalize_parts(project_id, &body).await {
            self.report_error(format!("Failed to finalize parts for project {project_id}: {e}"));
            return Err(e);
        }
        info!(project_id, parts = body.parts.len(), "parts finalized");
        self.fetch_project_by_id(project_id).await;
        Ok(())
    }

    /// Replace the chapter outline of a part of the active project, then
    /// refetch the project.
    pub async fn finalize_chapters(
        &self,
        part_id: &str,
        chapters: Vec<ChapterOutline>,
    ) -> Result<(), ApiError> {
        let Some(project_id) = self.active_project_id() else {
            warn!(part_id, "no active project; not finalizing chapters");
            return Ok(());
        };
        let _loading = self.inner.begin_loading();
        let body = FinalizeChaptersRequest { chapters };
        if let Err(e) = self.inner.api.finalize_chapters(part_id, &body).await {
            self.report_error(format!("Failed to finalize chapters for part {part_id}: {e}"));
            return Err(e);
        }
        info!(part_id, chapters = body.chapters.len(), "chapters finalized");
        self.fetch_project_by_id(&project_id).await;
        Ok(())
    }

    /// Write the book-level introduction or conclusion, then refetch.
    pub async fn finalize_book(
        &self,
        project_id: &str,
        task_type: FinalizeTask,
    ) -> Result<Project, ApiError> {
        let _loading = self.inner.begin_loading();
        let body = FinalizeBookRequest { task_type };
        match self.inner.api.finalize_book(project_id, &body).await {
            Ok(project) => {
                info!(project_id, %task_type, "book finalized");
                self.fetch_project_by_id(project_id).await;
                Ok(project)
            }
            Err(e) => {
                self.report_error(format!("Failed to write {task_type} for project {project_id}: {e}"));
                Err(e)
            }
        }
    }

    /// Submit reviewed chapter content, then refetch the active project.
    pub async fn review_chapter(
        &self,
        chapter_id: &str,
        review: ChapterReview,
    ) -> Result<Chapter, ApiError> {
        let _loading = self.inner.begin_loading();
        match self.inner.api.review_chapter(chapter_id, &review).await {
            Ok(chapter) => {
                info!(chapter_id, status = ?chapter.status, "chapter reviewed");
                if let Some(project_id) = self.active_project_id() {
                    self.fetch_project_by_id(&project_id).await;
                }
                Ok(chapter)
            }
            Err(e) => {
                self.report_error(format!("Failed to save review for chapter {chapter_id}: {e}"));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Getters
    // -----------------------------------------------------------------------

    pub fn projects(&self) -> Vec<Project> {
        self.inner.read().projects.clone()
    }

    pub fn project_count(&self) -> usize {
        self.inner.read().projects.len()
    }

    pub fn active_project(&self) -> Option<Project> {
        self.inner.read().active_project.clone()
    }

    fn active_project_id(&self) -> Option<String> {
        self.inner.read().active_project.as_ref().map(|p| p.id.clone())
    }

    /// Ids with generation work in flight, sorted.
    pub fn processing_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().processing_ids.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_processing(&self, id: &str) -> bool {
        self.inner.read().processing_ids.contains_key(id)
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().loading > 0
    }

    /// Inline transition analysis last returned for a chapter.
    pub fn transition_analysis(&self, chapter_id: &str) -> Option<TransitionAnalysis> {
        self.inner.read().transition_analyses.get(chapter_id).cloned()
    }

    /// Mark `id` before its start request goes out. A new action replaces
    /// any error left by an earlier one.
    fn mark_processing(&self, id: &str) {
        let mut state = self.inner.write();
        let count = state.processing_ids.entry(id.to_string()).or_insert(0);
        *count += 1;
        debug!(entity_id = id, jobs = *count, "marking as processing");
        state.error = None;
    }

    fn report_error(&self, message: String) {
        if let Some(feedback) = &self.inner.feedback {
            feedback.show_error(message.clone());
        }
        self.inner.write().error = Some(message);
    }
}

#[async_trait]
impl JobReconciler for ProjectStore {
    fn clear_processing(&self, entity_id: &str) {
        debug!(entity_id, "releasing processing marker");
        self.inner.write().release(entity_id);
    }

    async fn refresh_project(&self, project_id: &str) {
        self.fetch_project_by_id(project_id).await;
    }

    fn record_error(&self, message: String) {
        self.report_error(message);
    }

    fn job_succeeded(&self, target: &PollTarget) {
        if let Some(feedback) = &self.inner.feedback {
            feedback.show_success(format!("Job {} completed.", target.job_id));
        }
    }
}
