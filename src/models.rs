//! Data models for the research assistant.
//!
//! This module contains the normalized data structures shared by the
//! orchestrator, the chat handler and the report generator. Every result
//! type derives `Default` and deserializes with `#[serde(default)]` so a
//! loosely-shaped backend payload can never leave a field undefined.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Category of research requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Market,
    Clinical,
    Regulatory,
    Competitive,
}

impl AnalysisType {
    /// Every analysis type, in display order.
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::Market,
        AnalysisType::Clinical,
        AnalysisType::Regulatory,
        AnalysisType::Competitive,
    ];
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisType::Market => write!(f, "Market"),
            AnalysisType::Clinical => write!(f, "Clinical"),
            AnalysisType::Regulatory => write!(f, "Regulatory"),
            AnalysisType::Competitive => write!(f, "Competitive"),
        }
    }
}

impl FromStr for AnalysisType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "market" => Ok(AnalysisType::Market),
            "clinical" => Ok(AnalysisType::Clinical),
            "regulatory" => Ok(AnalysisType::Regulatory),
            "competitive" => Ok(AnalysisType::Competitive),
            other => Err(Error::InvalidRequest(format!(
                "unknown analysis type '{}'",
                other
            ))),
        }
    }
}

/// User-supplied analysis intent. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    molecule_name: String,
    analysis_types: Vec<AnalysisType>,
    additional_context: Option<String>,
}

impl AnalysisRequest {
    /// Validate and build a request.
    ///
    /// The molecule name is trimmed and must be non-empty; the type set must
    /// contain at least one entry (duplicates are collapsed).
    pub fn new(
        molecule_name: impl Into<String>,
        analysis_types: impl IntoIterator<Item = AnalysisType>,
        additional_context: Option<String>,
    ) -> Result<Self> {
        let molecule_name = molecule_name.into().trim().to_string();
        if molecule_name.is_empty() {
            return Err(Error::InvalidRequest(
                "molecule name must not be empty".to_string(),
            ));
        }

        let mut analysis_types: Vec<AnalysisType> = analysis_types.into_iter().collect();
        analysis_types.sort();
        analysis_types.dedup();
        if analysis_types.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one analysis type is required".to_string(),
            ));
        }

        let additional_context = additional_context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            molecule_name,
            analysis_types,
            additional_context,
        })
    }

    pub fn molecule_name(&self) -> &str {
        &self.molecule_name
    }

    pub fn analysis_types(&self) -> &[AnalysisType] {
        &self.analysis_types
    }

    pub fn additional_context(&self) -> Option<&str> {
        self.additional_context.as_deref()
    }
}

/// Lifecycle state of a single agent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Error,
}

impl StepStatus {
    /// Position in the forward-only lifecycle. `Completed` and `Error` are
    /// both terminal.
    pub fn rank(&self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::InProgress => 1,
            StepStatus::Completed | StepStatus::Error => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    /// Single-character marker used by the terminal progress view.
    pub fn symbol(&self) -> &'static str {
        match self {
            StepStatus::Pending => "○",
            StepStatus::InProgress => "◐",
            StepStatus::Completed => "●",
            StepStatus::Error => "✖",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::InProgress => write!(f, "in-progress"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Error => write!(f, "error"),
        }
    }
}

impl From<&str> for StepStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "completed" | "complete" | "done" | "success" => StepStatus::Completed,
            "error" | "failed" => StepStatus::Error,
            "in-progress" | "in_progress" | "running" | "processing" | "active" => {
                StepStatus::InProgress
            }
            _ => StepStatus::Pending,
        }
    }
}

/// One stage of the fixed analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStep {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub output: Option<String>,
}

impl AgentStep {
    /// Creates a pending step with no progress.
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            status: StepStatus::Pending,
            progress: 0.0,
            started_at: None,
            ended_at: None,
            output: None,
        }
    }

    /// Marks the step in-progress, stamping the start time once.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.status = StepStatus::InProgress;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Marks the step completed with progress forced to 100.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.status = StepStatus::Completed;
        self.progress = 100.0;
        self.ended_at = Some(now);
    }
}

/// Molecule profile shown at the top of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoleculeData {
    pub name: String,
    pub formula: String,
    pub molecular_weight: f64,
    pub category: String,
    pub mechanism: String,
    pub indications: Vec<String>,
}

/// A competing product in the same market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Competitor {
    pub name: String,
    pub company: String,
    pub category: String,
    /// Percentage share of the market.
    pub market_share: f64,
    pub revenue: f64,
}

/// Market intelligence section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketData {
    /// Total market size in USD.
    pub market_size: f64,
    /// Percentage share held by the analyzed molecule.
    pub market_share: f64,
    /// Annual growth rate, in percent.
    pub growth_rate: f64,
    pub projected_market_2028: f64,
    pub competitors: Vec<Competitor>,
}

/// A registered clinical trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalTrial {
    pub id: String,
    pub title: String,
    pub phase: String,
    pub status: String,
    pub enrollment: u32,
    pub condition: String,
    pub sponsor: String,
    pub start_date: String,
    pub estimated_completion: String,
}

/// Primary patent protecting the molecule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatentInfo {
    pub patent_number: String,
    pub title: String,
    pub filing_date: String,
    pub expiry_date: String,
    pub status: String,
    pub holder: String,
}

/// FDA / EMA approval state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegulatoryStatus {
    pub fda: String,
    pub ema: String,
    pub approval_date: String,
    pub approved_indications: Vec<String>,
    pub label_warnings: Vec<String>,
}

/// Tone of a generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum InsightType {
    Positive,
    Negative,
    #[default]
    Neutral,
    Opportunity,
}

impl InsightType {
    pub fn emoji(&self) -> &'static str {
        match self {
            InsightType::Positive => "🟢",
            InsightType::Negative => "🔴",
            InsightType::Neutral => "⚪",
            InsightType::Opportunity => "💡",
        }
    }
}

impl From<&str> for InsightType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "positive" => InsightType::Positive,
            "negative" | "risk" => InsightType::Negative,
            "opportunity" => InsightType::Opportunity,
            _ => InsightType::Neutral,
        }
    }
}

impl From<String> for InsightType {
    fn from(s: String) -> Self {
        InsightType::from(s.as_str())
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightType::Positive => write!(f, "Positive"),
            InsightType::Negative => write!(f, "Negative"),
            InsightType::Neutral => write!(f, "Neutral"),
            InsightType::Opportunity => write!(f, "Opportunity"),
        }
    }
}

/// An AI-generated finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub category: String,
    pub title: String,
    pub content: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    pub source: String,
}

/// A cited reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub publisher: String,
    pub date: String,
    pub url: String,
    pub reliability: f64,
}

/// The normalized outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub molecule_name: String,
    pub molecule_data: MoleculeData,
    pub market_data: MarketData,
    pub clinical_trials: Vec<ClinicalTrial>,
    pub patent_info: PatentInfo,
    pub regulatory_status: RegulatoryStatus,
    pub insights: Vec<Insight>,
    pub sources: Vec<Source>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::System => write!(f, "system"),
        }
    }
}

/// Reference attached to an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<ChatSource>>,
}

impl ChatMessage {
    fn with_role(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            sources: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::Assistant, content)
    }

    /// Attaches cited sources; an empty list is stored as `None`.
    pub fn with_sources(mut self, sources: Vec<ChatSource>) -> Self {
        self.sources = if sources.is_empty() {
            None
        } else {
            Some(sources)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(AnalysisRequest::new("", [AnalysisType::Market], None).is_err());
        assert!(AnalysisRequest::new("   ", [AnalysisType::Market], None).is_err());
        assert!(AnalysisRequest::new("Aspirin", [], None).is_err());

        let request = AnalysisRequest::new(
            "  Aspirin ",
            [AnalysisType::Clinical, AnalysisType::Market, AnalysisType::Clinical],
            Some("  ".to_string()),
        )
        .unwrap();
        assert_eq!(request.molecule_name(), "Aspirin");
        assert_eq!(
            request.analysis_types(),
            &[AnalysisType::Market, AnalysisType::Clinical]
        );
        assert_eq!(request.additional_context(), None);
    }

    #[test]
    fn test_analysis_type_from_str() {
        assert_eq!("market".parse::<AnalysisType>().unwrap(), AnalysisType::Market);
        assert_eq!(" Clinical ".parse::<AnalysisType>().unwrap(), AnalysisType::Clinical);
        assert!("pricing".parse::<AnalysisType>().is_err());
    }

    #[test]
    fn test_step_status_wire_names() {
        assert_eq!(StepStatus::from("running"), StepStatus::InProgress);
        assert_eq!(StepStatus::from("COMPLETED"), StepStatus::Completed);
        assert_eq!(StepStatus::from("failed"), StepStatus::Error);
        assert_eq!(StepStatus::from("queued"), StepStatus::Pending);
        assert_eq!(
            serde_json::to_string(&StepStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn test_step_lifecycle_stamps() {
        let mut step = AgentStep::new("market", "Market Intelligence Agent", "");
        let now = Utc::now();
        step.begin(now);
        assert_eq!(step.status, StepStatus::InProgress);
        assert_eq!(step.started_at, Some(now));

        step.progress = 40.0;
        step.complete(now);
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.progress, 100.0);
        assert!(step.ended_at.is_some());
    }

    #[test]
    fn test_insight_type_tolerates_backend_categories() {
        let insight: Insight =
            serde_json::from_str(r#"{"id": "i1", "type": "market", "title": "Big"}"#).unwrap();
        assert_eq!(insight.insight_type, InsightType::Neutral);
        assert_eq!(insight.confidence, 0.0);

        let insight: Insight = serde_json::from_str(r#"{"type": "Opportunity"}"#).unwrap();
        assert_eq!(insight.insight_type, InsightType::Opportunity);
    }

    #[test]
    fn test_chat_message_sources() {
        let message = ChatMessage::assistant("hi").with_sources(vec![]);
        assert!(message.sources.is_none());
        assert_eq!(message.role, ChatRole::Assistant);
    }
}
