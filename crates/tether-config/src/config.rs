//! Configuration management for the handoff server and clients.

use crate::{ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default TTL for issued handoff codes, in seconds.
pub const DEFAULT_CODE_TTL_SECS: u64 = 300;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default bind address for the handoff API.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7420";

/// Default Redis URL (can be overridden at compile time via TETHER_REDIS_URL).
pub const DEFAULT_REDIS_URL: &str = match option_env!("TETHER_REDIS_URL") {
    Some(url) => url,
    None => "redis://127.0.0.1:6379",
};

/// Which backing store holds issued handoff codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local locked map. Single-instance deployments only.
    Memory,
    /// External Redis store with native atomic delete-and-return.
    Redis,
}

/// Main configuration for Tether processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Address the handoff API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Handoff code TTL in seconds.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,
    /// Code store backend.
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    /// Redis URL (used when `store_backend` is `redis`, and for the
    /// pub/sub realtime channel).
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_code_ttl_secs() -> u64 {
    DEFAULT_CODE_TTL_SECS
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            code_ttl_secs: DEFAULT_CODE_TTL_SECS,
            store_backend: StoreBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("TETHER_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(bind_addr) = std::env::var("TETHER_BIND_ADDR") {
            self.bind_addr = bind_addr;
        }
        if let Ok(redis_url) = std::env::var("TETHER_REDIS_URL") {
            self.redis_url = redis_url;
        }
        if let Ok(backend) = std::env::var("TETHER_STORE_BACKEND") {
            match backend.as_str() {
                "memory" => self.store_backend = StoreBackend::Memory,
                "redis" => self.store_backend = StoreBackend::Redis,
                other => {
                    tracing::warn!(backend = %other, "Unknown store backend, keeping current");
                }
            }
        }
        if let Ok(ttl) = std::env::var("TETHER_CODE_TTL_SECS") {
            if let Ok(secs) = ttl.parse::<u64>() {
                self.code_ttl_secs = secs;
            }
        }
    }
}
