//! Extension health endpoint.
//!
//! Mermaid rendering happens entirely in the browser; the server side only
//! reports that the extension is loaded.

use axum::Json;
use serde::Serialize;

/// Body returned by the health endpoint.
///
/// The values never change between requests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub rendering: &'static str,
}

impl HealthStatus {
    pub const fn active() -> Self {
        Self {
            status: "ok",
            message: "jupyterlab_mmd_to_png_extension is active",
            rendering: "client-side",
        }
    }
}

/// `GET {base_url}jupyterlab-mmd-to-png-extension/health`
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus::active())
}
