//! Bearer token authentication.
//!
//! Enabled only when an API key is configured. The router applies it with
//! `route_layer`, so `/v1/health` and unmatched paths are never challenged.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HttpError;

/// Auth middleware: validate `Authorization: Bearer <key>`.
///
/// Returns 401 with `WWW-Authenticate: Bearer` on failure.
pub async fn require_bearer(expected: Arc<str>, req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            next.run(req).await
        }
        _ => {
            tracing::warn!(
                target: "voxgate.http",
                path = %req.uri().path(),
                "Unauthorized request - missing or invalid token"
            );
            HttpError::Unauthorized.into_response()
        }
    }
}

/// Compare two byte slices without early exit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
