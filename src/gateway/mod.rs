//! AI gateway — a single schema-constrained call to a text-generation service
//!
//! Defines the client trait and the fixed response schema. Two
//! implementations:
//! - `GeminiGateway`: calls the Gemini `generateContent` REST API (production)
//! - `MockGateway`: returns preconfigured responses (testing)
//!
//! The gateway returns the raw completion text. Parsing and validation are
//! the caller's job.

mod gemini;

pub use gemini::{GeminiGateway, DEFAULT_GEMINI_URL, DEFAULT_MODEL};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Errors from gateway calls. The message is surfaced to clients verbatim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Request(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("AI service returned no text")]
    EmptyResponse,
    #[error("failed to decode AI service response: {0}")]
    Decode(String),
}

/// Client trait for the generation service.
///
/// Abstracts over transport so the proxy does not depend on which service
/// or mock answers.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Generate a completion for `prompt`, constrained to `response_schema()`.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Response schema requested from the model.
///
/// Uses the OpenAPI subset the Gemini API accepts for `responseSchema`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": {
                "type": "NUMBER",
                "description": "The confidence score from 0 to 100, where 100 is fully verifiable/true and 0 is false/unsupported."
            },
            "summary": {
                "type": "STRING",
                "description": "A one-sentence, unbiased summary of the fact-check result."
            },
            "sources": {
                "type": "ARRAY",
                "items": {
                    "type": "STRING",
                    "description": "A highly trusted URL that verifies or contradicts the claim."
                },
                "description": "A list of at least two URLs from trusted sources."
            }
        },
        "required": ["score", "summary", "sources"]
    })
}

/// Mock gateway for testing — returns preconfigured responses in order.
///
/// When the queue runs dry the last response is repeated. Prompts are
/// recorded so tests can inspect what was sent.
pub struct MockGateway {
    responses: Mutex<VecDeque<Result<String, GatewayError>>>,
    last: Mutex<Option<Result<String, GatewayError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGateway {
    /// A gateway that answers every prompt with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new().then_reply(text)
    }

    /// A gateway whose every call fails with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self::new().then_fail(error)
    }

    fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another successful reply.
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue another failure.
    pub fn then_fail(self, error: GatewayError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: Result<String, GatewayError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AiGateway for MockGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = self
            .last
            .lock()
            .map_err(|_| GatewayError::Request("mock gateway poisoned".to_string()))?;
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last.clone().unwrap_or(Err(GatewayError::EmptyResponse)),
        }
    }
}
