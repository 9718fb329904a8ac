//! Client identification utilities
//!
//! Reading caller credentials out of request headers.

use axum::http::{HeaderMap, header};

/// Extract a bearer token from the `Authorization` header
///
/// The scheme is matched case-insensitively. An empty token is treated
/// as absent so callers can fall back to the session cookie.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
