use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

/// DeepRead runtime configuration.
///
/// Layered: defaults, then the TOML file, then `DEEPREAD_*` environment
/// variables. Command-line flags are applied on top by `main`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Directory holding the single uploaded PDF
    pub pdf_dir: PathBuf,
    /// Retrieval backend base URL
    pub backend_url: String,
    /// Where the reader page is served
    pub reader_url: String,
    /// Gateway base URL used by client commands
    pub gateway_url: String,
    /// Rolling JSON log directory; console only when unset
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            pdf_dir: PathBuf::from("public/pdfs"),
            backend_url: "http://localhost:8000".to_string(),
            reader_url: "http://localhost:3000".to_string(),
            gateway_url: "http://localhost:3000".to_string(),
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

/// `DEEPREAD_CONFIG`, else `<config dir>/deepread/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DEEPREAD_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("deepread"))
        .unwrap_or_else(|| PathBuf::from(".deepread"))
        .join(CONFIG_FILE_NAME)
}

impl Config {
    /// Load the file at `path` (a missing file means defaults), then apply the
    /// process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist; using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config TOML at: {}", path.display()))
    }

    /// Override fields from environment variables looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = var("DEEPREAD_BIND") {
            self.bind_address = bind;
        }
        if let Some(port) = var("DEEPREAD_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(dir) = var("DEEPREAD_PDF_DIR") {
            self.pdf_dir = PathBuf::from(dir);
        }
        if let Some(url) = var("DEEPREAD_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = var("DEEPREAD_READER_URL") {
            self.reader_url = url;
        }
        if let Some(url) = var("DEEPREAD_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(dir) = var("DEEPREAD_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("RUST_LOG") {
            self.log_level = level;
        }
    }

    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_address, self.port))
    }
}
