//! HTTP client for the analysis and chat backend.

use super::types::{
    AnalysisStatusResponse, AnalysisSummary, ChatReply, ChatRequest, ChatResponse,
    StartAnalysisRequest, StartAnalysisResponse,
};
use super::{AnalysisService, ChatService};
use crate::error::{Error, Result};
use crate::models::AnalysisType;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// reqwest-backed implementation of both backend services.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for the backend rooted at `base_url`
    /// (e.g. `http://localhost:8000/api/v1`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "backend URL must start with 'http://' or 'https://': {}",
                base_url
            )));
        }

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decode a response body, turning non-2xx statuses into [`Error::Api`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl AnalysisService for HttpBackend {
    async fn start(
        &self,
        molecule_name: &str,
        analysis_types: &[AnalysisType],
        additional_context: Option<&str>,
    ) -> Result<StartAnalysisResponse> {
        let body = StartAnalysisRequest {
            molecule_name: molecule_name.to_string(),
            analysis_types: analysis_types.to_vec(),
            additional_context: additional_context.map(String::from),
        };

        debug!("POST {}", self.url("/analysis/start"));
        let response = self
            .http_client
            .post(self.url("/analysis/start"))
            .json(&body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn get(&self, analysis_id: &str) -> Result<AnalysisStatusResponse> {
        let response = self
            .http_client
            .get(self.url(&format!("/analysis/{}", analysis_id)))
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<AnalysisSummary>> {
        let response = self
            .http_client
            .get(self.url("/analyses"))
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        Self::decode(response).await
    }
}

#[async_trait]
impl ChatService for HttpBackend {
    async fn send(
        &self,
        message: &str,
        analysis_id: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply> {
        let body = ChatRequest {
            message: message.to_string(),
            analysis_id: analysis_id.map(String::from),
            conversation_id: conversation_id.map(String::from),
        };

        debug!("POST {}", self.url("/chat"));
        let response = self
            .http_client
            .post(self.url("/chat"))
            .json(&body)
            .send()
            .await?;

        let chat: ChatResponse = Self::decode(response).await?;
        Ok(ChatReply::from(chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8000/api/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(
            backend.url("/analysis/start"),
            "http://localhost:8000/api/v1/analysis/start"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = HttpBackend::new("localhost:8000", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        // Port 9 (discard) is not expected to serve HTTP.
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = backend.get("missing").await;
        tokio_test::assert_err!(result);
    }
}
