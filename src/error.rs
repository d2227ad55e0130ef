//! HTTP error type for axum request handlers and middleware.
//!
//! [`ApiError`] renders every failure in the same JSON shape the notebook
//! front-end expects from server API endpoints:
//!
//! ```json
//! { "message": "Forbidden", "reason": null }
//! ```
//!
//! Middleware and fallbacks return an [`ApiError`] and let
//! [`IntoResponse`] pick the status code and body.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not carry a valid session token.
    #[error("Forbidden")]
    Forbidden,

    /// No route matched the requested path.
    #[error("Not Found")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn reason(&self) -> Option<String> {
        match self {
            Self::Forbidden => None,
            Self::NotFound(path) => Some(format!("no handler for {path}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(%status, error = %self, "request rejected");
        let message = status.canonical_reason().unwrap_or("Unknown Error");
        (
            status,
            Json(json!({ "message": message, "reason": self.reason() })),
        )
            .into_response()
    }
}

/// Router fallback: unknown paths get a JSON 404 instead of an empty body.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_owned())
}
