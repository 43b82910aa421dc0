//! Fact-check proxy: HTTP endpoint between clients and the AI gateway.
//!
//! Routes:
//! - `POST /fact-check`: analyze `{text}` and return `{score, summary, sources}`
//! - `GET /healthz`: liveness
//!
//! The proxy holds the service credential so clients never see it. Each
//! request is independent: no session, no caching, no retry.

mod error;
mod prompt;
mod sanitize;

pub use error::{
    ErrorBody, ProxyError, ANALYSIS_FAILED_MESSAGE, MALFORMED_DETAILS, NO_TEXT_MESSAGE,
};
pub use prompt::fact_check_prompt;
pub use sanitize::strip_fences;

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::config::ProxyConfig;
use crate::gateway::{AiGateway, GeminiGateway};
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
struct ProxyState {
    gateway: Arc<dyn AiGateway>,
}

/// Build the proxy router around `gateway`.
pub fn router(gateway: Arc<dyn AiGateway>) -> Router {
    Router::new()
        .route("/fact-check", post(fact_check))
        .route("/healthz", get(healthz))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ProxyState { gateway })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn fact_check(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Json<AnalysisResult>, ProxyError> {
    // An unparseable body is treated the same as one without text.
    let request: AnalysisRequest = serde_json::from_slice(&body).unwrap_or_default();
    let text = request.text().ok_or(ProxyError::NoText)?;

    info!(text_chars = text.len(), "fact-check requested");
    let result = analyze(state.gateway.as_ref(), text).await?;
    info!(score = ?result.score, sources = result.sources.len(), "fact-check complete");
    Ok(Json(result))
}

/// Run one fact-check through `gateway`: prompt, generate, strip, parse, validate.
pub async fn analyze(gateway: &dyn AiGateway, text: &str) -> Result<AnalysisResult, ProxyError> {
    let prompt = fact_check_prompt(text);

    let raw = gateway.generate(&prompt).await.map_err(|e| {
        error!("AI gateway or proxy error: {}", e);
        ProxyError::from(e)
    })?;
    let raw = raw.trim();

    let value: serde_json::Value = serde_json::from_str(&strip_fences(raw)).map_err(|e| {
        error!(raw_ai_response = %raw, "failed to parse JSON response from AI");
        ProxyError::unparseable(e, raw)
    })?;

    AnalysisResult::from_model_output(&value).map_err(|e| {
        error!(raw_ai_response = %raw, "AI response does not match schema: {}", e);
        ProxyError::bad_shape(e, raw)
    })
}

/// Bind the listener for `config`, resolving a host name if one was given.
pub async fn bind_listener(config: &ProxyConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(config.address()).await
}

/// Serve the proxy until the process is stopped. Returns the process exit code.
pub fn run_server(config: ProxyConfig) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let gateway = GeminiGateway::new(config.api_key.clone(), config.model.clone());
        let app = router(Arc::new(gateway));

        let listener = match bind_listener(&config).await {
            Ok(l) => l,
            Err(e) => {
                error!("failed to bind {}: {}", config.address(), e);
                return 1;
            }
        };

        info!(model = %config.model, "Fact-Checker Proxy running on http://{}", config.address());

        if let Err(e) = axum::serve(listener, app).await {
            error!("proxy server error: {}", e);
            return 1;
        }

        0
    })
}
