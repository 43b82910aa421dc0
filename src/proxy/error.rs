//! Proxy errors and their JSON renderings.

use crate::analysis::ShapeError;
use crate::gateway::GatewayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const NO_TEXT_MESSAGE: &str = "No text provided for fact-checking.";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Internal server error during AI analysis.";
pub const MALFORMED_DETAILS: &str = "AI returned malformed JSON.";

/// Errors the fact-check route can return.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{}", NO_TEXT_MESSAGE)]
    NoText,

    #[error("upstream call failed: {0}")]
    Upstream(#[from] GatewayError),

    /// Output that is not JSON after fence stripping, or JSON of the wrong shape.
    #[error("malformed AI output: {reason}")]
    MalformedOutput { reason: String, raw: String },
}

impl ProxyError {
    pub fn unparseable(err: serde_json::Error, raw: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: err.to_string(),
            raw: raw.into(),
        }
    }

    pub fn bad_shape(err: ShapeError, raw: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: err.to_string(),
            raw: raw.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoText => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::MalformedOutput { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::NoText => ErrorBody {
                error: NO_TEXT_MESSAGE.to_string(),
                details: None,
                raw_ai_response: None,
            },
            Self::Upstream(e) => ErrorBody {
                error: ANALYSIS_FAILED_MESSAGE.to_string(),
                details: Some(e.to_string()),
                raw_ai_response: None,
            },
            Self::MalformedOutput { raw, .. } => ErrorBody {
                error: ANALYSIS_FAILED_MESSAGE.to_string(),
                details: Some(MALFORMED_DETAILS.to_string()),
                raw_ai_response: Some(raw.clone()),
            },
        }
    }
}

/// JSON body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ai_response: Option<String>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
