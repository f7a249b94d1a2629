use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::http::headers::DuplicatePolicy;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "RAWHTTP_CONFIG";
/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub routes: RoutesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Initial size of each connection's read buffer. It doubles as needed.
    pub read_buffer_size: usize,
    pub duplicate_headers: DuplicatePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 42069,
            read_buffer_size: 1024,
            duplicate_headers: DuplicatePolicy::Fold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Base URL that `/httpbin/...` is forwarded to.
    pub upstream: Url,
    pub video_path: PathBuf,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            upstream: Url::parse("http://httpbin.org").expect("static URL is valid"),
            video_path: PathBuf::from("./assets/vim.mp4"),
        }
    }
}

impl Config {
    /// Loads the file named by `RAWHTTP_CONFIG` (defaults if unset), then
    /// applies `PORT`.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            cfg.server.port = port
                .parse()
                .with_context(|| format!("Invalid {} value: {}", PORT_ENV, port))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.read_buffer_size == 0 {
            anyhow::bail!("server.read_buffer_size must be at least 1");
        }
        if self.routes.upstream.scheme() != "http" {
            anyhow::bail!(
                "routes.upstream must be an http:// URL, got {}",
                self.routes.upstream
            );
        }
        Ok(())
    }
}
