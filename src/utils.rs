use axum::http::{header::USER_AGENT, HeaderMap, HeaderValue};
use std::net::IpAddr;

/// Maximum stored length of a User-Agent string
const MAX_USER_AGENT_CHARS: usize = 512;

/// Extracts client IP address from HTTP request headers
///
/// Checks headers in order of priority:
/// 1. X-Forwarded-For (first IP in the chain, if present)
/// 2. X-Real-IP (single IP, if present)
/// 3. Falls back to provided direct IP (from connection)
///
/// X-Forwarded-For can be spoofed by clients. It is recorded as provenance
/// only, never used for admission decisions.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return Some(normalize_ip(ip));
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return Some(normalize_ip(ip));
    }

    direct_ip.map(normalize_ip)
}

/// Normalizes IP address to string format (IPv4-mapped IPv6 becomes IPv4)
fn normalize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        IpAddr::V4(v4) => v4.to_string(),
    }
}

/// User-Agent header, if present and printable, truncated for storage
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .map(|ua| ua.chars().take(MAX_USER_AGENT_CHARS).collect())
}

/// Adds the fixed set of security headers to a response
pub fn add_security_headers(headers: &mut HeaderMap) {
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'self'"),
    );
}
