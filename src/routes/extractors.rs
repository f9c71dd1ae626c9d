// ============================================================================
// Axum Extractors
// ============================================================================
//
// Custom extractors for Axum routes:
// - AuthenticatedUser: subject of a verified bearer token (inserted by require_auth)
// - ClientProvenance: client IP and User-Agent recorded on created messages
//
// ============================================================================

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::auth::AuthManager;
use crate::error::AppError;
use crate::message::RequestProvenance;
use crate::utils::{extract_client_ip, extract_user_agent};

/// Subject (`sub` claim) of the caller's verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Validate the bearer credential in `headers`.
///
/// Header problems and token problems are reported separately so the
/// caller learns which one to fix.
pub fn authenticate(
    auth_manager: &AuthManager,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Authorization header must start with Bearer"))?;

    let subject = auth_manager.subject(token)?;
    Ok(AuthenticatedUser(subject))
}

/// Request provenance extractor. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientProvenance(pub RequestProvenance);

#[async_trait]
impl<S> FromRequestParts<S> for ClientProvenance
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent when the router is served without connect info (tests)
        let direct_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientProvenance(RequestProvenance {
            ip_address: extract_client_ip(&parts.headers, direct_ip),
            user_agent: extract_user_agent(&parts.headers),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::config::JwtConfig;
    use axum::http::{HeaderValue, Request};

    fn manager() -> AuthManager {
        AuthManager::new(&JwtConfig {
            secret: "extractor-test-secret".to_string(),
            issuer: "chatservice".to_string(),
            expiry_hours: 1,
        })
        .unwrap()
    }

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn unauthorized_message(result: Result<AuthenticatedUser, AppError>) -> String {
        match result {
            Err(AppError::Unauthorized(msg)) => msg,
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_authenticate_accepts_valid_token() {
        let auth = manager();
        let token = auth.create_token("user123").unwrap();
        let user = authenticate(&auth, &with_auth(&format!("Bearer {}", token))).unwrap();
        assert_eq!(user, AuthenticatedUser("user123".to_string()));
    }

    #[test]
    fn test_authenticate_header_problems() {
        let auth = manager();
        assert_eq!(
            unauthorized_message(authenticate(&auth, &HeaderMap::new())),
            "Missing Authorization header"
        );
        assert_eq!(
            unauthorized_message(authenticate(&auth, &with_auth("Basic dXNlcjpwYXNz"))),
            "Authorization header must start with Bearer"
        );
        assert_eq!(
            unauthorized_message(authenticate(&auth, &with_auth("Bearer "))),
            "Authorization header must start with Bearer"
        );
    }

    #[test]
    fn test_authenticate_rejects_bad_token() {
        let auth = manager();
        let result = authenticate(&auth, &with_auth("Bearer not-a-jwt"));
        assert!(matches!(result, Err(AppError::Auth(AuthError::Malformed))));

        let expired = auth
            .create_token_at("user123", chrono::Utc::now() - chrono::Duration::hours(2))
            .unwrap();
        let result = authenticate(&auth, &with_auth(&format!("Bearer {}", expired)));
        assert!(matches!(result, Err(AppError::Auth(AuthError::Expired))));
    }

    #[tokio::test]
    async fn test_provenance_prefers_forwarded_header() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .header("user-agent", "Test Agent")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ClientProvenance(provenance) = ClientProvenance::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(provenance.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(provenance.user_agent.as_deref(), Some("Test Agent"));
    }
}
