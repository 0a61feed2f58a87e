//! Configuration for controller-store

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// URI prefix that selects the delegated (remote) backend
pub const REMOTE_PREFIX: &str = "http://";

/// Default local store directory
pub fn default_location() -> String {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("controller-store")
        .to_string_lossy()
        .into_owned()
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Local directory or `http://host:port/path` of a control service
    #[serde(default = "default_location")]
    pub location: String,

    /// Timeout for each remote request in milliseconds
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Delay between bulk load attempts in milliseconds
    #[serde(default = "default_load_retry_delay_ms")]
    pub load_retry_delay_ms: u64,

    /// Warn every N failed load attempts
    #[serde(default = "default_load_warn_every")]
    pub load_warn_every: u32,

    /// Give up loading after this many attempts (0 = never give up)
    #[serde(default)]
    pub max_load_attempts: u32,

    /// Network autoconfiguration interval in milliseconds.
    /// Members with a log entry younger than twice this count as active.
    #[serde(default = "default_autoconf_interval_ms")]
    pub autoconf_interval_ms: u64,
}

fn default_http_timeout_ms() -> u64 {
    60_000
}

fn default_load_retry_delay_ms() -> u64 {
    250
}

fn default_load_warn_every() -> u32 {
    8
}

fn default_autoconf_interval_ms() -> u64 {
    60_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            http_timeout_ms: default_http_timeout_ms(),
            load_retry_delay_ms: default_load_retry_delay_ms(),
            load_warn_every: default_load_warn_every(),
            max_load_attempts: 0,
            autoconf_interval_ms: default_autoconf_interval_ms(),
        }
    }
}

impl StoreConfig {
    /// Config with defaults for everything but the location
    pub fn with_location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn load_retry_delay(&self) -> Duration {
        Duration::from_millis(self.load_retry_delay_ms)
    }

    /// Window within which a member's last log entry makes it active
    pub fn active_window_ms(&self) -> u64 {
        self.autoconf_interval_ms.saturating_mul(2)
    }

    pub fn parsed_location(&self) -> Result<Location, StoreError> {
        Location::parse(&self.location)
    }
}

/// Where documents live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Hierarchical file tree rooted at a directory
    Local(PathBuf),
    /// Control service reachable over HTTP
    Remote {
        host: String,
        port: u16,
        base_path: String,
    },
}

impl Location {
    /// Parse a location string.
    ///
    /// `http://host[:port][/path]` selects the remote backend; anything else
    /// is a local directory. Bracketed IPv6 hosts are not supported.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let Some(rest) = s.strip_prefix(REMOTE_PREFIX) else {
            if s.is_empty() {
                return Err(StoreError::InvalidLocation("empty location".into()));
            }
            return Ok(Location::Local(PathBuf::from(s)));
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        if authority.starts_with('[') {
            return Err(StoreError::InvalidLocation(format!(
                "IPv6 literal hosts are not supported: {}",
                s
            )));
        }

        let (host, port) = match authority.rfind(':') {
            Some(idx) => {
                let port = authority[idx + 1..]
                    .parse::<u16>()
                    .map_err(|_| StoreError::InvalidLocation(format!("bad port in {}", s)))?;
                (&authority[..idx], port)
            }
            None => (authority, 80),
        };

        if host.is_empty() {
            return Err(StoreError::InvalidLocation(format!("missing host in {}", s)));
        }

        let base_path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Ok(Location::Remote {
            host: host.to_string(),
            port,
            base_path,
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote { .. })
    }
}
