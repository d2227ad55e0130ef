use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod api;
mod config;
mod error;
mod extension;
mod host;
mod url;

pub use config::Config;
pub use host::HostApp;

const DEFAULT_LOG_FILTER: &str = "mmd_to_png_server=info,tower_http=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // When invoked as a Docker HEALTHCHECK, hit the health route and exit.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck(&config).await;
    }

    init_tracing(&config.server);

    let token = match config.server.configured_token() {
        Some(token) => token,
        None => {
            let token = Uuid::new_v4().simple().to_string();
            warn!(
                token_env = %config.server.token_env,
                %token,
                "no token configured, generated one for this session"
            );
            token
        }
    };

    let ip: IpAddr = config
        .server
        .ip
        .parse()
        .with_context(|| format!("invalid listen address `{}`", config.server.ip))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let mut web_app = HostApp::new(config.server.clone(), token);
    extension::setup_handlers(&mut web_app);

    info!(
        %addr,
        base_url = %web_app.base_url(),
        routes = ?web_app.routes(),
        "mmd-to-png server starting"
    );

    let app = web_app.into_router()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("server stopped");
    Ok(())
}

/// `MMD_CONFIG` names a TOML file; without it the defaults apply.
fn load_config() -> anyhow::Result<Config> {
    match std::env::var_os("MMD_CONFIG").map(PathBuf::from) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn init_tracing(server: &config::ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(server.log_level.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match server.log_format {
        config::LogFormat::Json => builder.json().init(),
        config::LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Lightweight healthcheck: GET the health route and exit 0 on 200, 1 otherwise.
/// Invoked via `mmd-to-png-server --healthcheck` from Docker HEALTHCHECK.
///
/// Needs the token from `token_env`; a generated token is not visible here.
async fn healthcheck(config: &Config) -> anyhow::Result<()> {
    let token = config
        .server
        .configured_token()
        .with_context(|| {
            format!("--healthcheck needs the token in ${}", config.server.token_env)
        })?;

    // A wildcard bind address is reachable on loopback.
    let host = match config.server.ip.as_str() {
        "0.0.0.0" | "" => "127.0.0.1".to_owned(),
        "::" => "[::1]".to_owned(),
        ip if ip.contains(':') => format!("[{ip}]"),
        ip => ip.to_owned(),
    };
    let url = format!(
        "http://{host}:{}{}",
        config.server.port,
        extension::health_pattern(&config.server.base_url)
    );

    let healthy = probe(&url, &token).await.unwrap_or(false);
    std::process::exit(if healthy { 0 } else { 1 });
}

/// `true` when `url` answers 200 with `"status": "ok"`.
async fn probe(url: &str, token: &str) -> anyhow::Result<bool> {
    let resp = reqwest::Client::new()
        .get(url)
        .header(reqwest::header::AUTHORIZATION, format!("token {token}"))
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    if !resp.status().is_success() {
        return Ok(false);
    }
    let body: serde_json::Value = resp.json().await.context("decoding health response")?;
    Ok(body["status"] == "ok")
}
