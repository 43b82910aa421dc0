//! Client side of the proxy call.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// How many characters of an error body are kept in the failure message.
const ERROR_BODY_PREVIEW: usize = 100;

/// Failures of a single proxy call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Proxy request failed: {0}")]
    Network(String),

    #[error("Proxy service failed: {status}. Details: {body}")]
    Status { status: String, body: String },

    #[error("Proxy response could not be read: {0}")]
    Body(String),
}

/// Something that can fact-check a text, usually the proxy over HTTP.
#[async_trait]
pub trait FactCheckService: Send + Sync {
    async fn check(&self, text: &str) -> Result<AnalysisResult, ServiceError>;
}

/// `FactCheckService` that posts to a proxy endpoint.
#[derive(Debug, Clone)]
pub struct HttpFactCheckClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpFactCheckClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FactCheckService for HttpFactCheckClient {
    async fn check(&self, text: &str) -> Result<AnalysisResult, ServiceError> {
        let preview: String = text.chars().take(50).collect();
        debug!(endpoint = %self.endpoint, "sending text to proxy: \"{}...\"", preview);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&AnalysisRequest::new(text))
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                ServiceError::Body(format!("{} (error body unreadable: {})", status, e))
            })?;
            return Err(ServiceError::Status {
                status: status.to_string(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| ServiceError::Body(e.to_string()))
    }
}
