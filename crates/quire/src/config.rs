//! Config file loading and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use quire_server::ServerSettings;
use serde::Deserialize;

/// Configuration file structure (quire.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSettings,
}

/// Server options shared by `serve` and `dev`. Each overrides the config file.
#[derive(Debug, Default, Args)]
pub struct ServerArgs {
    /// Directory containing the Markdown/MDX sources
    #[arg(short, long, env = "QUIRE_ROOT")]
    pub root: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "QUIRE_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "QUIRE_PORT")]
    pub port: Option<u16>,

    /// Path prefix for the files and fetch routes
    #[arg(long, env = "QUIRE_API_PREFIX")]
    pub api_prefix: Option<String>,

    /// Allowed CORS origin (repeatable; any origin when none given)
    #[arg(long = "cors-origin", env = "QUIRE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "QUIRE_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,
}

impl ServerArgs {
    /// Layer these options over `settings`.
    pub fn apply(self, mut settings: ServerSettings) -> ServerSettings {
        if let Some(root) = self.root {
            settings.root = root;
        }
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(api_prefix) = self.api_prefix {
            settings.api_prefix = api_prefix;
        }
        if !self.cors_origins.is_empty() {
            settings.cors_origins = self.cors_origins;
        }
        if let Some(secs) = self.request_timeout {
            settings.request_timeout_secs = secs;
        }
        settings
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().unwrap();

        let config = load_config(&temp.path().join("quire.toml")).unwrap();

        assert_eq!(config.server, ServerSettings::default());
    }

    #[test]
    fn reads_server_table() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("quire.toml");
        fs::write(
            &path,
            r#"
[server]
root = "content"
port = 8080
api_prefix = "/docs/api"
cors_origins = ["http://localhost:3000", "https://example.com"]
"#,
        )
        .unwrap();

        let settings = load_config(&path).unwrap().server;

        assert_eq!(settings.root, PathBuf::from("content"));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.api_prefix, "/docs/api");
        assert_eq!(settings.cors_origins.len(), 2);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("quire.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_server_keys_are_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("quire.toml");
        fs::write(&path, "[server]\nprot = 3002\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn arguments_override_file_settings() {
        let file = ServerSettings {
            port: 8080,
            api_prefix: "/docs".to_string(),
            ..Default::default()
        };
        let args = ServerArgs {
            port: Some(9000),
            cors_origins: vec!["https://example.com".to_string()],
            ..Default::default()
        };

        let settings = args.apply(file);

        assert_eq!(settings.port, 9000);
        assert_eq!(settings.api_prefix, "/docs");
        assert_eq!(settings.cors_origins, vec!["https://example.com"]);
    }
}
