// ============================================================================
// Health Routes
// ============================================================================
//
// Endpoints:
// - GET /health - Liveness, no dependencies touched
// - GET /health/ready - Readiness, pings the message store
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/ready
pub async fn readiness(State(app_context): State<Arc<AppContext>>) -> impl IntoResponse {
    match app_context.service.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "timestamp": Utc::now() })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "timestamp": Utc::now() })),
            )
        }
    }
}
