//! Configuration types for the mmd-to-png server.
//!
//! Config is optional: when `MMD_CONFIG` is unset the built-in defaults are
//! used. When a file is given it is loaded once at startup and validated
//! before the server opens any ports. Invalid configs are rejected with a
//! clear error rather than silently falling back to defaults.
//!
//! # Example
//! ```toml
//! [server]
//! ip        = "0.0.0.0"
//! port      = 8888
//! base_url  = "/user/alice/"
//! token_env = "JUPYTER_TOKEN"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::url::normalize_base_url;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse, normalise and validate a config document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content).context("parsing config TOML")?;
        config.server.base_url = normalize_base_url(&config.server.base_url);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base_url = &self.server.base_url;

        // The base URL becomes a static route prefix, so it must not carry
        // route-template syntax or URL components other than a path.
        anyhow::ensure!(
            !base_url.contains(['{', '}', '?', '#']),
            "base_url `{}` must be a plain path (no `{{`, `}}`, `?` or `#`)",
            base_url
        );
        // Routes match the percent-encoded request path, so a prefix needing
        // encoding could never be reached.
        if let Some(c) = base_url.chars().find(|c| !is_path_char(*c)) {
            anyhow::bail!(
                "base_url `{}` contains `{}`, which must be percent-encoded in a URL path",
                base_url,
                c.escape_default()
            );
        }
        for segment in base_url.split('/') {
            anyhow::ensure!(
                !segment.starts_with(':') && !segment.starts_with('*'),
                "base_url `{}` has segment `{}` that looks like a route parameter",
                base_url,
                segment
            );
        }

        anyhow::ensure!(
            self.server.request_timeout_secs != Some(0),
            "request_timeout_secs must be greater than 0 (omit it to disable the timeout)"
        );

        anyhow::ensure!(
            !self.server.token_env.is_empty(),
            "token_env must name an environment variable"
        );

        Ok(())
    }
}

/// RFC 3986 `pchar` (minus `%`) or the `/` separator.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~!$&'()*+,;=:@/".contains(c)
}

/// Listener, mount point and access settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to bind (default: `127.0.0.1`).
    #[serde(default = "defaults::ip")]
    pub ip: String,

    /// Port to bind (default: 8888).
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Path prefix the server is mounted under (default: `/`).
    ///
    /// Always stored with a leading and trailing slash.
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Environment variable whose value is the access token (default:
    /// `JUPYTER_TOKEN`). When the variable is unset or empty a random token
    /// is generated at startup and logged.
    #[serde(default = "defaults::token_env")]
    pub token_env: String,

    /// Value for `Access-Control-Allow-Origin`. Leave unset to disable CORS.
    #[serde(default)]
    pub allow_origin: Option<String>,

    /// Per-request timeout in seconds. Leave unset for no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set, e.g. `"debug"`.
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: defaults::ip(),
            port: defaults::port(),
            base_url: defaults::base_url(),
            token_env: defaults::token_env(),
            allow_origin: None,
            request_timeout_secs: None,
            log_level: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Resolve the access token from `token_env`, if set and non-empty.
    pub fn configured_token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

mod defaults {
    pub fn ip() -> String { "127.0.0.1".into() }
    pub fn port() -> u16 { 8888 }
    pub fn base_url() -> String { "/".into() }
    pub fn token_env() -> String { "JUPYTER_TOKEN".into() }
}
