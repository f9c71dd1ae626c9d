// ============================================================================
// Axum Middleware
// ============================================================================
//
// Middleware for request processing:
// - request_logging: Log all incoming requests
// - add_security_headers: Add security headers to responses
// - rate_limiting: Global token-bucket admission (429 when empty)
// - require_auth: Bearer token check for message routes (when enabled)
//
// ============================================================================

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::authenticate;
use crate::utils::add_security_headers as utils_add_security_headers;

/// Request logging middleware
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    tracing::debug!(
        method = %method,
        path = %path,
        "Incoming request"
    );

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

/// Add security headers to responses
pub async fn add_security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    utils_add_security_headers(response.headers_mut());
    response
}

/// Rate limiting middleware
///
/// Takes one token from the shared bucket per request. An empty bucket
/// short-circuits with 429 and the handler never runs.
pub async fn rate_limiting(
    State(ctx): State<Arc<AppContext>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !ctx.rate_limiter.try_acquire() {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            capacity = ctx.rate_limiter.capacity(),
            "Rate limit exceeded"
        );
        return Err(AppError::RateLimited {
            retry_after: ctx.rate_limiter.refill_period(),
        });
    }

    Ok(next.run(req).await)
}

/// Authentication middleware for message routes
///
/// On success the verified subject is attached as an `AuthenticatedUser`
/// request extension.
pub async fn require_auth(
    State(ctx): State<Arc<AppContext>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !ctx.config.auth_enabled {
        return Ok(next.run(req).await);
    }

    let user = authenticate(&ctx.auth_manager, req.headers())?;
    tracing::debug!(subject = %user.0, path = %req.uri().path(), "Request authenticated");

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
