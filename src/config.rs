use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, ensure};
use serde::Deserialize;

/// Env var naming the YAML config file.
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";
/// Env var overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

const DEFAULT_CONFIG_PATH: &str = "warden.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Connections served at once; further accepts wait for a slot.
    pub max_connections: usize,
    /// Size of each socket read fed to the parser.
    pub read_chunk_size: usize,
    /// Idle limit for a single read. 0 waits forever.
    pub read_timeout_secs: u64,
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            max_connections: 1024,
            read_chunk_size: 1024,
            read_timeout_secs: 30,
            max_request_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Document root.
    pub root: PathBuf,
    /// Document served for `/`.
    pub index: String,
    /// Value of the `Server` response header.
    pub server_name: String,
    /// Size of the blocks a file is streamed in.
    pub block_size: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./html"),
            index: "index.html".to_string(),
            server_name: "warden".to_string(),
            block_size: 1024,
        }
    }
}

impl Config {
    /// Loads the file named by `WARDEN_CONFIG` (default `warden.yaml`) and
    /// applies env overrides. A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Self::from_yaml(&raw).with_context(|| format!("parsing config {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        let cfg = cfg.with_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw)?;
        Ok(cfg)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            self.server.listen_addr = addr;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.server.max_connections > 0, "server.max_connections must be positive");
        ensure!(self.server.read_chunk_size > 0, "server.read_chunk_size must be positive");
        ensure!(self.server.max_request_bytes > 0, "server.max_request_bytes must be positive");
        ensure!(self.static_files.block_size > 0, "static_files.block_size must be positive");
        ensure!(!self.static_files.index.is_empty(), "static_files.index must not be empty");
        Ok(())
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        match self.server.read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
