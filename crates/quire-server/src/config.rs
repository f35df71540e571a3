//! Server configuration.
//!
//! [`ServerSettings`] is what users write (TOML, flags, environment);
//! [`ServerConfig`] is the validated, immutable form the server runs on.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use quire_content::{ContentRoot, ContentRootError};
use serde::Deserialize;

/// Raw settings, every field optional in the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Directory containing the Markdown/MDX sources
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path prefix for the files and fetch routes
    pub api_prefix: String,

    /// Origins allowed by CORS; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Upper bound on handling a single request
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("docs"),
            host: "127.0.0.1".to_string(),
            port: 3001,
            api_prefix: "/api/mdx".to_string(),
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Configuration problems detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port {0}: must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Invalid API prefix {0:?}: {1}")]
    InvalidPrefix(String, &'static str),

    #[error("Invalid CORS origin {0:?}: {1}")]
    InvalidOrigin(String, &'static str),

    #[error("Invalid request timeout: must be at least one second")]
    InvalidTimeout,

    #[error("Invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    ContentRoot(#[from] ContentRootError),
}

/// Which origins CORS admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Validated configuration. Only obtainable through [`ServerSettings::validate`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    root: ContentRoot,
    addr: SocketAddr,
    api_prefix: String,
    cors_origins: CorsOrigins,
    request_timeout: Duration,
}

impl ServerSettings {
    /// Check every field once and pin the content root.
    pub fn validate(&self) -> Result<ServerConfig, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let addr_str = format!("{}:{}", self.host, self.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(addr_str.clone()))?;

        let api_prefix = normalize_prefix(&self.api_prefix)?;
        let cors_origins = parse_origins(&self.cors_origins)?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let root = ContentRoot::open(&self.root)?;

        Ok(ServerConfig {
            root,
            addr,
            api_prefix,
            cors_origins,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

impl ServerConfig {
    pub fn root(&self) -> &ContentRoot {
        &self.root
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Normalized prefix: leading `/`, no trailing `/`.
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn cors_origins(&self) -> &CorsOrigins {
        &self.cors_origins
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidPrefix(raw.to_string(), reason);

    if !raw.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("must not be empty"));
    }

    if trimmed
        .chars()
        .any(|c| matches!(c, '{' | '}' | '*' | '?' | '#') || c.is_whitespace())
    {
        return Err(invalid("contains reserved characters"));
    }

    Ok(trimmed.to_string())
}

fn parse_origins(raw: &[String]) -> Result<CorsOrigins, ConfigError> {
    if raw.is_empty() {
        return Ok(CorsOrigins::Any);
    }

    if raw.iter().any(|origin| origin == "*") {
        if raw.len() > 1 {
            return Err(ConfigError::InvalidOrigin(
                "*".to_string(),
                "wildcard cannot be combined with explicit origins",
            ));
        }
        return Ok(CorsOrigins::Any);
    }

    raw.iter()
        .map(|origin| {
            let origin = origin.trim_end_matches('/');
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(ConfigError::InvalidOrigin(
                    origin.to_string(),
                    "must start with http:// or https://",
                ));
            }
            HeaderValue::from_str(origin).map_err(|_| {
                ConfigError::InvalidOrigin(origin.to_string(), "not a valid header value")
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CorsOrigins::List)
}
