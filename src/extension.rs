//! Server-side half of the Mermaid-to-PNG notebook extension.
//!
//! Diagrams are rendered and converted in the browser, so the only thing
//! registered here is a health route the front-end can poll to confirm the
//! server extension is loaded.

use axum::routing::get;

use crate::{
    api::health::health_check,
    host::HostApp,
    url::{normalize_base_url, url_path_join},
};

/// Path namespace under the host's base URL.
pub const EXTENSION_PATH: &str = "jupyterlab-mmd-to-png-extension";

/// Path of the health route for a given mount prefix.
pub fn health_pattern(base_url: &str) -> String {
    url_path_join(&[&normalize_base_url(base_url), EXTENSION_PATH, "health"])
}

/// Register this extension's routes with the host.
pub fn setup_handlers(web_app: &mut HostApp) {
    let health_pattern = health_pattern(web_app.base_url());
    let health_handler = web_app.authenticated(get(health_check));

    web_app.add_handlers(vec![(health_pattern, health_handler)]);
}
