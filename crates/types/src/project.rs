// crates/types/src/project.rs
//! Projects, parts and chapters as served by the backend, plus the request
//! payloads used to create and finalize them.

use serde::{Deserialize, Deserializer, Serialize};

/// A book project. The list endpoint returns summaries (no parts); the detail
/// endpoint fills `parts` with their chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default, alias = "blueprint")]
    pub raw_blueprint: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Decimal cost, kept verbatim. The backend serializes it as a string,
    /// older builds as a number.
    #[serde(default, deserialize_with = "decimal_as_string")]
    pub total_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_outline: Option<serde_json::Value>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Project {
    /// Look up a part of this project by id.
    pub fn part(&self, part_id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == part_id)
    }

    /// Look up a chapter anywhere in this project by id.
    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.parts
            .iter()
            .flat_map(|p| p.chapters.iter())
            .find(|c| c.id == chapter_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub part_number: u32,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub chapter_number: u32,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub brief: Option<ChapterBrief>,
    #[serde(default)]
    pub suggested_agent: Option<String>,
}

/// Structured writing brief handed to the specialist agent of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterBrief {
    pub thesis_statement: String,
    pub narrative_arc: String,
    #[serde(default)]
    pub required_inclusions: Vec<String>,
    #[serde(default)]
    pub key_questions_to_answer: Vec<String>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub raw_blueprint: String,
}

/// One approved part in a `finalize-parts` submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOutline {
    pub part_number: u32,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizePartsRequest {
    pub parts: Vec<PartOutline>,
}

/// One approved chapter in a `finalize-chapters` submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub chapter_number: u32,
    pub title: String,
    pub brief: ChapterBrief,
    pub suggested_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeChaptersRequest {
    pub chapters: Vec<ChapterOutline>,
}

/// Book-level section written once every chapter is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalizeTask {
    Introduction,
    Conclusion,
}

impl std::fmt::Display for FinalizeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalizeTask::Introduction => write!(f, "introduction"),
            FinalizeTask::Conclusion => write!(f, "conclusion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeBookRequest {
    pub task_type: FinalizeTask,
}

/// Human review of generated chapter content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterReview {
    pub content: String,
    #[serde(default = "default_review_status")]
    pub new_status: String,
}

impl ChapterReview {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            new_status: default_review_status(),
        }
    }
}

fn default_review_status() -> String {
    "CONTENT_REVIEWED".to_string()
}

fn decimal_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_summary_deserialize() {
        let json = r#"{
            "id": "proj-1",
            "raw_blueprint": "A history of tea",
            "status": "DRAFT",
            "total_cost": "0.00421000"
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, "proj-1");
        assert_eq!(project.total_cost.as_deref(), Some("0.00421000"));
        assert!(project.parts.is_empty());
        assert!(project.structured_outline.is_none());
    }

    #[test]
    fn test_total_cost_accepts_number() {
        let json = r#"{"id": "p", "blueprint": "x", "total_cost": 1.5}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.raw_blueprint, "x");
        assert_eq!(project.total_cost.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_project_detail_lookups() {
        let json = r#"{
            "id": "proj-1",
            "raw_blueprint": "bp",
            "total_cost": null,
            "parts": [{
                "id": "part-7",
                "part_number": 1,
                "title": "Origins",
                "summary": "Where it started",
                "chapters": [{
                    "id": "ch-3",
                    "chapter_number": 1,
                    "title": "Leaves",
                    "status": "BRIEF_READY",
                    "brief": {
                        "thesis_statement": "Tea shaped trade",
                        "narrative_arc": "From monastery to market",
                        "required_inclusions": ["Silk Road"],
                        "key_questions_to_answer": ["Who drank it first?"]
                    },
                    "suggested_agent": "historian"
                }]
            }]
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.total_cost.is_none());
        assert_eq!(project.part("part-7").unwrap().title, "Origins");
        let chapter = project.chapter("ch-3").unwrap();
        assert_eq!(chapter.suggested_agent.as_deref(), Some("historian"));
        assert_eq!(
            chapter.brief.as_ref().unwrap().required_inclusions,
            vec!["Silk Road".to_string()]
        );
        assert!(project.chapter("missing").is_none());
    }

    #[test]
    fn test_finalize_book_request_serialize() {
        let body = FinalizeBookRequest {
            task_type: FinalizeTask::Conclusion,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"task_type": "conclusion"})
        );
    }

    #[test]
    fn test_chapter_review_defaults_status() {
        let review: ChapterReview = serde_json::from_str(r#"{"content": "Edited"}"#).unwrap();
        assert_eq!(review, ChapterReview::new("Edited"));
        assert_eq!(review.new_status, "CONTENT_REVIEWED");
    }
}
