// crates/client/src/http.rs
//! reqwest-backed implementation of [`BackendApi`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use bookforge_types::{
    Chapter, ChapterReview, CreateProjectRequest, FinalizeBookRequest, FinalizeChaptersRequest,
    FinalizePartsRequest, HealthStatus, JobHandle, JobStatusReport, Part, Project,
    TransitionAnalysis,
};

use crate::api::BackendApi;
use crate::config::ClientConfig;
use crate::error::{error_message, ApiError};

/// HTTP client for the bookforge backend.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    api_token: Option<String>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl {
                url: config.base_url.clone(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Build)?;

        Ok(Self {
            base_url,
            client,
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %path, "API request");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| ApiError::Request {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|source| ApiError::Request {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            let message = error_message(&String::from_utf8_lossy(&bytes));
            debug!(%method, %path, status = status.as_u16(), %message, "API error response");
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        debug!(%method, %path, status = status.as_u16(), bytes = bytes.len(), "API response");
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::POST, path, None).await
    }
}

fn seg(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl BackendApi for HttpClient {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("/").await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/projects").await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.get(&format!("/projects/{}", seg(project_id))).await
    }

    async fn create_project(&self, raw_blueprint: &str) -> Result<Project, ApiError> {
        let body = CreateProjectRequest {
            raw_blueprint: raw_blueprint.to_string(),
        };
        self.send(Method::POST, "/projects", Some(&body)).await
    }

    async fn generate_parts(&self, project_id: &str) -> Result<JobHandle, ApiError> {
        self.post_empty(&format!("/crew/generate-parts/{}", seg(project_id)))
            .await
    }

    async fn finalize_parts(
        &self,
        project_id: &str,
        body: &FinalizePartsRequest,
    ) -> Result<Project, ApiError> {
        let path = format!("/projects/{}/finalize-parts", seg(project_id));
        self.send(Method::PUT, &path, Some(body)).await
    }

    async fn generate_chapters(&self, part_id: &str) -> Result<JobHandle, ApiError> {
        self.post_empty(&format!("/crew/generate-chapters/{}", seg(part_id)))
            .await
    }

    async fn finalize_chapters(
        &self,
        part_id: &str,
        body: &FinalizeChaptersRequest,
    ) -> Result<Part, ApiError> {
        let path = format!("/parts/{}/finalize-chapters", seg(part_id));
        self.send(Method::PUT, &path, Some(body)).await
    }

    async fn generate_chapter_content(&self, chapter_id: &str) -> Result<JobHandle, ApiError> {
        self.post_empty(&format!("/chapters/{}/generate", seg(chapter_id)))
            .await
    }

    async fn analyze_transition(&self, chapter_id: &str) -> Result<TransitionAnalysis, ApiError> {
        self.post_empty(&format!("/chapters/{}/analyze-transition", seg(chapter_id)))
            .await
    }

    async fn review_chapter(
        &self,
        chapter_id: &str,
        review: &ChapterReview,
    ) -> Result<Chapter, ApiError> {
        let path = format!("/chapters/{}/review", seg(chapter_id));
        self.send(Method::PUT, &path, Some(review)).await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusReport, ApiError> {
        self.get(&format!("/crew/status/{}", seg(job_id))).await
    }

    async fn agent_names(&self) -> Result<Vec<String>, ApiError> {
        self.get("/crew/agents").await
    }

    async fn finalize_book(
        &self,
        project_id: &str,
        body: &FinalizeBookRequest,
    ) -> Result<Project, ApiError> {
        let path = format!("/projects/{}/finalize", seg(project_id));
        self.send(Method::POST, &path, Some(body)).await
    }
}
