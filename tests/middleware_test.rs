// ============================================================================
// Middleware Tests
// ============================================================================
//
// Tests for the router's middleware stack:
// - Token bucket admission (429 + Retry-After)
// - Bearer authentication on message routes (when enabled)
// - Security headers and health endpoints
//
// ============================================================================

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
};
use chat_service::{
    auth::AuthManager,
    config::{JwtConfig, RateLimitConfig},
};
use serde_json::json;

use test_utils::{create_message, get, send, spawn_app, test_config, TEST_ISSUER, TEST_SECRET};

fn auth_config() -> chat_service::config::Config {
    let mut config = test_config();
    config.auth_enabled = true;
    config
}

fn token_for(subject: &str) -> String {
    AuthManager::new(&JwtConfig {
        secret: TEST_SECRET.to_string(),
        issuer: TEST_ISSUER.to_string(),
        expiry_hours: 1,
    })
    .unwrap()
    .create_token(subject)
    .unwrap()
}

fn get_with_auth(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_requests_beyond_burst_get_429() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        requests_per_minute: 1,
        burst_size: 3,
    };
    let app = spawn_app(config);

    for _ in 0..3 {
        assert_eq!(get(&app, "/v1/messages").await.status, StatusCode::OK);
    }

    let response = get(&app, "/v1/messages").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error_code"], "RATE_LIMITED");
    assert_eq!(response.body["error"], "Too many requests, please try again later");
    assert_eq!(response.headers["retry-after"], "60");
    // Rejections still carry the security headers
    assert_eq!(response.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_rate_limit_covers_health() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        requests_per_minute: 1,
        burst_size: 1,
    };
    let app = spawn_app(config);

    assert_eq!(get(&app, "/health").await.status, StatusCode::OK);
    assert_eq!(
        get(&app, "/health").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_rejected_requests_do_not_reach_handlers() {
    let mut config = test_config();
    config.rate_limit = RateLimitConfig {
        requests_per_minute: 1,
        burst_size: 2,
    };
    let app = spawn_app(config);

    create_message(&app, "admitted").await;
    create_message(&app, "admitted too").await;

    let response = test_utils::post_json(
        &app,
        "/v1/messages",
        &json!({ "content": "rejected", "sender_id": "u", "message_type": "text" }),
    )
    .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_auth_disabled_by_default() {
    let app = spawn_app(test_config());
    assert_eq!(get(&app, "/v1/messages").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_header_is_401() {
    let app = spawn_app(auth_config());

    let response = get(&app, "/v1/messages").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error_code"], "AUTH_ERROR");
    assert_eq!(response.body["error"], "Missing Authorization header");
}

#[tokio::test]
async fn test_non_bearer_header_is_401() {
    let app = spawn_app(auth_config());

    let response = send(&app, get_with_auth("/v1/messages", "Basic dXNlcjpwYXNz")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["error"],
        "Authorization header must start with Bearer"
    );
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let app = spawn_app(auth_config());

    let response = send(&app, get_with_auth("/v1/messages", "Bearer invalid.token.here")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid or expired token");

    // Signed with a different key
    let forged = AuthManager::new(&JwtConfig {
        secret: "some-other-secret".to_string(),
        issuer: TEST_ISSUER.to_string(),
        expiry_hours: 1,
    })
    .unwrap()
    .create_token("user123")
    .unwrap();
    let response = send(
        &app,
        get_with_auth("/v1/messages", &format!("Bearer {}", forged)),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_is_admitted() {
    let app = spawn_app(auth_config());
    let token = token_for("user123");

    let response = send(
        &app,
        get_with_auth("/v1/messages", &format!("Bearer {}", token)),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_health_does_not_require_auth() {
    let app = spawn_app(auth_config());
    assert_eq!(get(&app, "/health").await.status, StatusCode::OK);
}

// ============================================================================
// Health and headers
// ============================================================================

#[tokio::test]
async fn test_health_reports_status_and_version() {
    let app = spawn_app(test_config());

    let response = get(&app, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    assert!(response.body["timestamp"].is_string());

    let response = get(&app, "/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = spawn_app(test_config());

    let response = get(&app, "/health").await;
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(response.headers["x-xss-protection"], "1; mode=block");
    assert_eq!(
        response.headers["strict-transport-security"],
        "max-age=31536000; includeSubDomains"
    );
    assert_eq!(
        response.headers["content-security-policy"],
        "default-src 'self'"
    );
}
