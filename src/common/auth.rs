//! API-key helpers for the console API

use axum::{
    body::Body,
    http::{Request, header},
};
use subtle::ConstantTimeEq;

/// Extract the console API key from a request
///
/// Checks `x-api-key` first, then `Authorization: Bearer <key>`.
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    let headers = request.headers();

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(|key| key.trim().to_string())
}

/// Constant-time string comparison, so response timing does not leak the key
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
