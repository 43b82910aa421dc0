use super::{response_schema, AiGateway, GatewayError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Gateway backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiGateway {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the gateway at a different API root (e.g. a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

/// Turn an error body from the API into the message shown to clients.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return format!("AI service error ({}): {}", status, body);
    };
    let error = envelope.error;
    match error.status.as_deref() {
        Some("INVALID_ARGUMENT") if error.message.contains("API key") => {
            "Invalid API key".to_string()
        }
        Some("PERMISSION_DENIED") => "Invalid API key".to_string(),
        Some("RESOURCE_EXHAUSTED") => {
            "API quota exceeded - please check your account".to_string()
        }
        _ => error.message,
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        info!(model = %self.model, prompt_chars = prompt.len(), "calling Gemini");

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                if e.is_timeout() {
                    GatewayError::Request("Request timeout - please try again".to_string())
                } else if e.is_connect() {
                    GatewayError::Request(
                        "Network error - could not reach the AI service".to_string(),
                    )
                } else {
                    GatewayError::Request(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(format!("Failed to read response: {}", e)))?;

        debug!(%status, "Gemini responded");

        if !status.is_success() {
            error!(%status, body = %body, "Gemini API error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: api_error_message(status, &body),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        let text: String = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }
}
