// src/health.rs

use axum::{extract::Extension, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::common::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
    pub version: &'static str,
    pub remote_store: &'static str,
}

/// GET /health
pub async fn health_check(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Json<HealthResponse> {
    let remote_available = state_lock.read().await.stores.remote_available();

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: "newsly-api",
        version: env!("CARGO_PKG_VERSION"),
        remote_store: if remote_available {
            "available"
        } else {
            "unavailable"
        },
    })
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}
