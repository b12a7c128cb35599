//! Wire types for the analysis and chat backend.
//!
//! Requests are sent in the backend's snake_case convention. Responses are
//! decoded leniently: both snake_case and camelCase spellings are accepted
//! and every field has a default, since the backend's shapes drift.

use crate::models::{AnalysisType, ChatSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Body of `POST /analysis/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartAnalysisRequest {
    pub molecule_name: String,
    pub analysis_types: Vec<AnalysisType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// Response of `POST /analysis/start`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartAnalysisResponse {
    #[serde(alias = "analysisId", alias = "id")]
    pub analysis_id: String,
    pub status: String,
    pub message: String,
}

/// Job state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl From<&str> for RemoteStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" => RemoteStatus::Completed,
            "error" | "failed" => RemoteStatus::Error,
            "processing" | "running" | "started" | "in-progress" => RemoteStatus::Processing,
            _ => RemoteStatus::Pending,
        }
    }
}

impl From<String> for RemoteStatus {
    fn from(s: String) -> Self {
        RemoteStatus::from(s.as_str())
    }
}

impl<'de> Deserialize<'de> for RemoteStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(RemoteStatus::from(raw))
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStatus::Pending => write!(f, "pending"),
            RemoteStatus::Processing => write!(f, "processing"),
            RemoteStatus::Completed => write!(f, "completed"),
            RemoteStatus::Error => write!(f, "error"),
        }
    }
}

/// One step as reported by the backend pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteStep {
    pub name: String,
    pub status: Option<String>,
    pub progress: Option<f64>,
    #[serde(alias = "result_summary", alias = "resultSummary", alias = "summary")]
    pub output: Option<String>,
}

/// Response of `GET /analysis/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisStatusResponse {
    pub status: RemoteStatus,
    pub progress: f64,
    pub steps: Vec<RemoteStep>,
    /// Raw results blob; shape is normalized by [`crate::normalize`].
    #[serde(alias = "result")]
    pub results: Option<Value>,
    pub error: Option<String>,
}

/// History row returned by `GET /analyses`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSummary {
    pub id: String,
    #[serde(alias = "moleculeName")]
    pub molecule_name: String,
    pub status: String,
    #[serde(alias = "createdAt")]
    pub created_at: Option<String>,
    pub progress: f64,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct NestedChatMessage {
    content: String,
    sources: Option<Vec<ChatSource>>,
}

/// Response of `POST /chat`, flattened or nested under `message`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    content: Option<String>,
    sources: Option<Vec<ChatSource>>,
    message: Option<NestedChatMessage>,
    #[serde(alias = "suggestedQuestions")]
    suggested_questions: Option<Vec<String>>,
    #[serde(alias = "conversationId")]
    conversation_id: Option<String>,
}

/// A chat reply in the shape the handler consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub sources: Vec<ChatSource>,
    pub suggested_questions: Vec<String>,
    pub conversation_id: Option<String>,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        let (nested_content, nested_sources) = match response.message {
            Some(m) => (Some(m.content), m.sources),
            None => (None, None),
        };

        Self {
            content: response.content.or(nested_content).unwrap_or_default(),
            sources: response.sources.or(nested_sources).unwrap_or_default(),
            suggested_questions: response.suggested_questions.unwrap_or_default(),
            conversation_id: response.conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_response_aliases() {
        let snake: StartAnalysisResponse =
            serde_json::from_str(r#"{"analysis_id": "a1", "status": "started"}"#).unwrap();
        let camel: StartAnalysisResponse =
            serde_json::from_str(r#"{"analysisId": "a1", "message": "ok"}"#).unwrap();
        assert_eq!(snake.analysis_id, "a1");
        assert_eq!(camel.analysis_id, "a1");
    }

    #[test]
    fn test_status_response_lenient() {
        let json = r#"{
            "id": "a1",
            "status": "processing",
            "progress": 42.5,
            "steps": [
                {"id": "clinical", "name": "Clinical Trials Agent", "description": "...",
                 "status": "in-progress", "progress": 30, "result_summary": "12 trials"},
                {"name": "Patent Analyzer"}
            ]
        }"#;
        let status: AnalysisStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, RemoteStatus::Processing);
        assert_eq!(status.steps.len(), 2);
        assert_eq!(status.steps[0].output.as_deref(), Some("12 trials"));
        assert!(status.steps[1].status.is_none());
        assert!(status.results.is_none());
    }

    #[test]
    fn test_remote_status_from_str() {
        assert_eq!(RemoteStatus::from("COMPLETED"), RemoteStatus::Completed);
        assert_eq!(RemoteStatus::from("failed"), RemoteStatus::Error);
        assert_eq!(RemoteStatus::from("started"), RemoteStatus::Processing);
        assert_eq!(RemoteStatus::from("queued"), RemoteStatus::Pending);
    }

    #[test]
    fn test_chat_response_flat_and_nested() {
        let flat: ChatResponse = serde_json::from_str(
            r#"{"content": "hi", "sources": [{"title": "FDA", "url": "u", "type": "regulatory"}],
                "suggestedQuestions": ["q"], "conversationId": "c1"}"#,
        )
        .unwrap();
        let reply = ChatReply::from(flat);
        assert_eq!(reply.content, "hi");
        assert_eq!(reply.sources[0].source_type, "regulatory");
        assert_eq!(reply.suggested_questions, vec!["q"]);
        assert_eq!(reply.conversation_id.as_deref(), Some("c1"));

        let nested: ChatResponse = serde_json::from_str(
            r#"{"conversation_id": "c2", "message": {"role": "assistant", "content": "hello"}}"#,
        )
        .unwrap();
        let reply = ChatReply::from(nested);
        assert_eq!(reply.content, "hello");
        assert!(reply.sources.is_empty());
    }

    #[test]
    fn test_start_request_snake_case() {
        let body = StartAnalysisRequest {
            molecule_name: "Aspirin".to_string(),
            analysis_types: vec![AnalysisType::Market],
            additional_context: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["molecule_name"], "Aspirin");
        assert_eq!(json["analysis_types"][0], "market");
        assert!(json.get("additional_context").is_none());
    }
}
