//! Host configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment variable that overrides `[upstream] url`.
pub const UPSTREAM_ENV: &str = "EVO_VIEW_UPSTREAM";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.override_upstream(std::env::var(UPSTREAM_ENV).ok());
        Ok(config)
    }

    fn override_upstream(&mut self, url: Option<String>) {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            info!("Upstream overridden by {}", UPSTREAM_ENV);
            self.upstream.url = url;
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

/// Where the simulation server lives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `http://127.0.0.1:8081`.
    #[serde(default = "default_upstream_url")]
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
        }
    }
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

impl UpstreamConfig {
    fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Snapshot socket on the simulation server.
    pub fn socket_url(&self) -> String {
        let base = self.base();
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if base.starts_with("ws://") || base.starts_with("wss://") {
            base.to_string()
        } else {
            format!("ws://{base}")
        };
        format!("{base}/ws")
    }

    /// Terrain map endpoint on the simulation server.
    pub fn map_url(&self) -> String {
        let base = self.base();
        let base = if let Some(rest) = base.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = base.strip_prefix("ws://") {
            format!("http://{rest}")
        } else if base.starts_with("http://") || base.starts_with("https://") {
            base.to_string()
        } else {
            format!("http://{base}")
        };
        format!("{base}/api/map")
    }
}
