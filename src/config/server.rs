use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::notify::DEFAULT_SEND_TIMEOUT;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL included in notification mail (e.g., "https://cases.example.com").
    /// If not set, notifications carry no link back to the server.
    pub public_base_url: Option<String>,
    /// Per-recipient timeout for notification sends, in seconds.
    pub notify_send_timeout_secs: u64,
}

impl ServerConfig {
    /// Reads a casefile.toml. Missing keys fall back to their defaults.
    pub fn load(path: &Path) -> Result<ServerConfig> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address {}:{}: {e}", self.host, self.port)))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("casefile.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            notify_send_timeout_secs: DEFAULT_SEND_TIMEOUT.as_secs(),
        }
    }
}
