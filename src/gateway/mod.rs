//! Minimal HTTP surface: `GET /health` returns the component registry.

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;

pub fn router() -> Router {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(crate::health::snapshot_json())
}

/// Serve the gateway until the task is aborted.
pub async fn run_gateway(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind gateway on {addr}"))?;
    let local = listener.local_addr()?;
    tracing::info!("Gateway listening on http://{local}/health");
    crate::health::mark_component_ok("gateway");

    axum::serve(listener, router())
        .await
        .context("Gateway server error")
}
