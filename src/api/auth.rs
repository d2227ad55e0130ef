//! Token authentication guard for server API routes.
//!
//! A request is authenticated when it presents the server token in one of
//! the forms the notebook front-end uses:
//!
//! - `Authorization: token <t>`
//! - `Authorization: Bearer <t>`
//! - `?token=<t>` query parameter
//!
//! Anything else is rejected with `403 Forbidden` before the wrapped handler
//! runs. The guard is applied per route with [`crate::host::HostApp::authenticated`],
//! so routes opt in to authentication the same way a handler method is
//! decorated.

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{error::ApiError, host::AppState};

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Axum middleware: runs the handler only when the request carries the
/// server token.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let presented = token_from_headers(req.headers()).or_else(|| token_from_query(req.uri()));

    match presented {
        Some(token) if tokens_match(&token, &state.token) => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "rejected request with invalid token");
            ApiError::Forbidden.into_response()
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "rejected unauthenticated request");
            ApiError::Forbidden.into_response()
        }
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let scheme_ok =
        scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    let token = token.trim();
    (scheme_ok && !token.is_empty()).then(|| token.to_owned())
}

fn token_from_query(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Compare without returning early on the first mismatching byte.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
