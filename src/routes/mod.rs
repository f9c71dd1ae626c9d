// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware stack
// - health.rs: Liveness and readiness endpoints
// - messages.rs: Message CRUD and anomaly check
// - extractors.rs: Custom Axum extractors (bearer auth, provenance)
// - middleware.rs: Request logging, security headers, rate limiting, auth
//
// ============================================================================

mod extractors;
mod health;
mod messages;
mod middleware;

pub use extractors::{authenticate, AuthenticatedUser, ClientProvenance};

use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    // Message routes sit behind the bearer check (a no-op unless AUTH_ENABLED)
    let message_routes = Router::new()
        .route(
            "/v1/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/v1/messages/:id",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route(
            "/v1/messages/:id/anomaly-check",
            get(messages::anomaly_check),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            app_context.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .merge(message_routes)
        // Apply middleware (ServiceBuilder order: first listed runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                // Request logging
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(CorsLayer::permissive())
                // Security headers (also on 429 responses)
                .layer(axum::middleware::from_fn(middleware::add_security_headers))
                // Admission gate, ahead of every route
                .layer(axum::middleware::from_fn_with_state(
                    app_context.clone(),
                    middleware::rate_limiting,
                ))
                .into_inner(),
        )
        .with_state(app_context)
}
