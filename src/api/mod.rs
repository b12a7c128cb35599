//! Remote backend contract.
//!
//! The orchestrator and chat handler talk to the backend only through the
//! [`AnalysisService`] and [`ChatService`] traits; [`HttpBackend`] is the
//! reqwest implementation used outside of tests.

pub mod client;
pub mod types;

pub use client::HttpBackend;
pub use types::{
    AnalysisStatusResponse, AnalysisSummary, ChatReply, RemoteStatus, RemoteStep,
    StartAnalysisResponse,
};

use crate::error::Result;
use crate::models::AnalysisType;
use async_trait::async_trait;

/// Remote analysis jobs.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submit a new analysis job.
    async fn start(
        &self,
        molecule_name: &str,
        analysis_types: &[AnalysisType],
        additional_context: Option<&str>,
    ) -> Result<StartAnalysisResponse>;

    /// Fetch the current status (and results, once completed) of a job.
    async fn get(&self, analysis_id: &str) -> Result<AnalysisStatusResponse>;

    /// List past analyses, newest first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<AnalysisSummary>>;
}

/// Remote chat assistant.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn send(
        &self,
        message: &str,
        analysis_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply>;
}
