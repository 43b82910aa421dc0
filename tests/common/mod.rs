//! Shared helpers for integration tests
//!
//! Builds the proxy router around a `MockGateway` and serves it either
//! in-process (`oneshot`) or on a real loopback listener.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use factcheck::gateway::MockGateway;
use factcheck::proxy;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

/// Upstream reply for the flat-earth scenario.
pub const FLAT_EARTH_REPLY: &str = r#"{"score": 2, "summary": "Contradicted by scientific consensus.", "sources": ["https://nasa.gov/earth-shape"]}"#;

pub fn proxy_with(gateway: MockGateway) -> (Router, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    (proxy::router(gateway.clone()), gateway)
}

/// Send `body` to `POST /fact-check` and return status and parsed JSON.
pub async fn post_fact_check(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/fact-check")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// A proxy served on 127.0.0.1 for the duration of a test.
pub struct RunningProxy {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl RunningProxy {
    pub async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local_addr should succeed");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/fact-check", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        let _ = (&mut self.handle).await;
    }
}
