//! The host web application extensions register themselves into.
//!
//! [`HostApp`] owns the pieces an extension consumes but never implements:
//! the mount prefix (`base_url`), the route table and the session guard.
//! Startup builds one, hands it to each extension's `setup_handlers`, then
//! turns it into a servable [`Router`] with [`HostApp::into_router`].

use std::{mem, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{http::HeaderValue, middleware, routing::MethodRouter, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    api::{auth, request_id},
    config::ServerConfig,
    error,
};

/// Read-only state shared by every request.
#[derive(Debug)]
pub struct AppState {
    pub settings: ServerConfig,
    /// Token a request must present to pass [`auth::require_token`].
    pub token: String,
}

impl AppState {
    pub fn new(settings: ServerConfig, token: String) -> Self {
        Self { settings, token }
    }
}

pub type Handler = MethodRouter<Arc<AppState>>;

pub struct HostApp {
    state: Arc<AppState>,
    router: Router<Arc<AppState>>,
    routes: Vec<String>,
}

impl HostApp {
    pub fn new(settings: ServerConfig, token: String) -> Self {
        Self {
            state: Arc::new(AppState::new(settings, token)),
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    /// Mount prefix, always starting and ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.state.settings.base_url
    }

    /// Wrap `handler` so it only runs for requests carrying the server token.
    pub fn authenticated(&self, handler: Handler) -> Handler {
        handler.route_layer(middleware::from_fn_with_state(
            Arc::clone(&self.state),
            auth::require_token,
        ))
    }

    /// Append `(pattern, handler)` pairs to the route table.
    ///
    /// # Panics
    ///
    /// Panics if a pattern is not a valid route path or is already
    /// registered for the same method.
    pub fn add_handlers(&mut self, handlers: Vec<(String, Handler)>) {
        for (pattern, handler) in handlers {
            tracing::debug!(%pattern, "registering handler");
            self.router = mem::take(&mut self.router).route(&pattern, handler);
            self.routes.push(pattern);
        }
    }

    /// Patterns registered so far, in registration order.
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    /// Finish the route table: JSON 404 fallback, request IDs, access
    /// logging and the optional CORS / timeout layers.
    pub fn into_router(self) -> anyhow::Result<Router> {
        let settings = &self.state.settings;
        let mut router = self.router.fallback(error::not_found);

        if let Some(secs) = settings.request_timeout_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }
        if let Some(origin) = settings.allow_origin.as_deref() {
            router = router.layer(cors_layer(origin)?);
        }

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_response(DefaultOnResponse::new().level(tracing::Level::INFO));

        Ok(router
            .layer(middleware::from_fn(request_id::request_id_middleware))
            .layer(trace_layer)
            .with_state(self.state))
    }
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(origin)
            .with_context(|| format!("allow_origin `{origin}` is not a valid header value"))?;
        AllowOrigin::exact(value)
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    fn host(settings: ServerConfig) -> HostApp {
        HostApp::new(settings, "tok".into())
    }

    #[test]
    fn base_url_comes_from_settings() {
        let settings = ServerConfig {
            base_url: "/user/alice/".into(),
            ..ServerConfig::default()
        };
        assert_eq!(host(settings).base_url(), "/user/alice/");
    }

    #[test]
    fn add_handlers_records_patterns_in_order() {
        let mut app = host(ServerConfig::default());
        app.add_handlers(vec![
            ("/a".into(), get(|| async { "a" })),
            ("/b".into(), get(|| async { "b" })),
        ]);
        assert_eq!(app.routes(), ["/a", "/b"]);
    }

    #[test]
    #[should_panic]
    fn duplicate_registration_panics() {
        let mut app = host(ServerConfig::default());
        app.add_handlers(vec![("/a".into(), get(|| async { "a" }))]);
        app.add_handlers(vec![("/a".into(), get(|| async { "again" }))]);
    }

    #[tokio::test]
    async fn unauthenticated_route_needs_no_token() {
        let mut app = host(ServerConfig::default());
        app.add_handlers(vec![("/open".into(), get(|| async { "open" }))]);

        let resp = app
            .into_router()
            .unwrap()
            .oneshot(Request::get("/open").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn authenticated_route_rejects_missing_token() {
        let mut app = host(ServerConfig::default());
        let handler = app.authenticated(get(|| async { "secret" }));
        app.add_handlers(vec![("/closed".into(), handler)]);

        let resp = app
            .into_router()
            .unwrap()
            .oneshot(Request::get("/closed").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_path_gets_json_404() {
        let resp = host(ServerConfig::default())
            .into_router()
            .unwrap()
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().contains_key("x-request-id"));

        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Not Found");
    }

    #[tokio::test]
    async fn cors_origin_is_echoed_when_configured() {
        let settings = ServerConfig {
            allow_origin: Some("https://lab.example.com".into()),
            ..ServerConfig::default()
        };
        let mut app = host(settings);
        app.add_handlers(vec![("/open".into(), get(|| async { "open" }))]);

        let resp = app
            .into_router()
            .unwrap()
            .oneshot(
                Request::get("/open")
                    .header("origin", "https://lab.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "https://lab.example.com"
        );
    }

    #[test]
    fn invalid_cors_origin_is_an_error() {
        let settings = ServerConfig {
            allow_origin: Some("bad\norigin".into()),
            ..ServerConfig::default()
        };
        assert!(host(settings).into_router().is_err());
    }
}
