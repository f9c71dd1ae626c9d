// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST   /v1/messages                       - Create a message
// - GET    /v1/messages?page=&limit=          - List, newest first
// - GET    /v1/messages/:id                   - Fetch one message
// - DELETE /v1/messages/:id                   - Delete one message
// - GET    /v1/messages/:id/anomaly-check     - Spam score for a stored message
//
// ============================================================================

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::message::CreateMessageRequest;
use crate::routes::extractors::{AuthenticatedUser, ClientProvenance};

/// Raw pagination parameters. Kept as strings so that junk values are
/// coerced to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// POST /v1/messages
pub async fn create_message(
    State(app_context): State<Arc<AppContext>>,
    ClientProvenance(provenance): ClientProvenance,
    user: Option<Extension<AuthenticatedUser>>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body.map_err(|e| AppError::validation(e.body_text()))?;

    if let Some(Extension(AuthenticatedUser(subject))) = &user {
        tracing::debug!(subject = %subject, sender_id = %request.sender_id, "Authenticated create");
    }

    let message = app_context.service.create(request, provenance).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /v1/messages/:id
pub async fn get_message(
    State(app_context): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_context.service.get(&id).await?;
    Ok(Json(message))
}

/// GET /v1/messages
pub async fn list_messages(
    State(app_context): State<Arc<AppContext>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let page = app_context
        .service
        .list(
            parse_param(query.page.as_deref()),
            parse_param(query.limit.as_deref()),
        )
        .await?;
    Ok(Json(page))
}

/// DELETE /v1/messages/:id
pub async fn delete_message(
    State(app_context): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_context.service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/messages/:id/anomaly-check
pub async fn anomaly_check(
    State(app_context): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let score = app_context.service.anomaly_check(&id).await?;
    Ok(Json(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_ignores_junk() {
        assert_eq!(parse_param(Some("3")), Some(3));
        assert_eq!(parse_param(Some(" -2 ")), Some(-2));
        assert_eq!(parse_param(Some("abc")), None);
        assert_eq!(parse_param(Some("")), None);
        assert_eq!(parse_param(None), None);
    }
}
