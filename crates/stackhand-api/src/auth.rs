//! Bearer token authentication.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// Extractor that admits only requests carrying the configured token.
///
/// Place it before any body extractor so unauthenticated requests are
/// rejected without reading the body.
pub struct RequireToken;

impl FromRequestParts<Arc<AppState>> for RequireToken {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::trim);

        match (state.token(), presented) {
            (Some(expected), Some(token)) if tokens_match(expected, token) => Ok(RequireToken),
            (_, None) => {
                warn!(path = %parts.uri.path(), "Missing bearer token");
                Err(unauthorized())
            }
            _ => {
                warn!(path = %parts.uri.path(), "Invalid bearer token");
                Err(unauthorized())
            }
        }
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})))
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3cres"));
        assert!(!tokens_match("s3cret", "s3cret2"));
        assert!(!tokens_match("s3cret", ""));
    }
}
