//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. Compiled defaults (the struct `Default` implementations)
//! 2. TOML file named by the `BEACON_CONFIG` env var (default
//!    `config/config.toml`, optional)
//! 3. `BEACON__*` environment variables with `__` as the nesting
//!    separator (e.g. `BEACON__GATEWAY__CACHE_TTL_MS=60000`)
//!
//! Independently of the layers above, `DISABLE_RPC_CACHE=true|1` forces
//! the selection cache off; it is an operational kill switch rather than
//! a configuration value.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind. Defaults to `127.0.0.1`.
    pub bind_address: String,

    /// Port to listen on. Must be greater than 0. Defaults to `8545`.
    pub bind_port: u16,

    /// Maximum concurrent in-flight HTTP requests. Defaults to `1000`.
    pub max_concurrent_requests: usize,

    /// Maximum number of items accepted in one batch body. Defaults to `100`.
    pub max_batch_size: usize,

    /// Directory for the embedded cache database. In-memory cache when absent.
    pub cache_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8545,
            max_concurrent_requests: 1000,
            max_batch_size: 100,
            cache_dir: None,
        }
    }
}

/// Selection engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Selection cache time-to-live in milliseconds. Defaults to one hour.
    pub cache_ttl_ms: u64,

    /// Deadline for each endpoint probe in milliseconds. Defaults to `5000`.
    pub probe_timeout_ms: u64,

    /// Deadline for each dispatched upstream call in milliseconds. Defaults to `10000`.
    pub request_timeout_ms: u64,

    /// KV key the cache document is stored under.
    pub cache_key: String,

    /// Disables the selection cache entirely (every call re-probes when
    /// the in-flight guard allows). Also forced on by the
    /// `DISABLE_RPC_CACHE` env var.
    pub disable_cache: bool,

    /// Path of the whitelist JSON document.
    pub whitelist_path: String,

    /// Inline whitelist, decimal-string chain id to URL list. Overrides
    /// `whitelist_path` when present.
    pub rpcs: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 3_600_000,
            probe_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
            cache_key: "permit2RpcManagerCache".to_string(),
            disable_cache: false,
            whitelist_path: "config/rpcs.json".to_string(),
            rpcs: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `debug`, `info`, `warn`, `error`, `none`. Defaults to `warn`.
    pub level: String,

    /// Output format: `json` or `pretty`. Defaults to `pretty`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "pretty".to_string() }
    }
}

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error", "none"];

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with `BEACON__*` environment
    /// overrides. The file is optional; defaults apply when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file or an override cannot be
    /// parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                File::with_name(&config_path.as_ref().to_string_lossy()).required(false),
            )
            .add_source(Environment::with_prefix("BEACON").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from the path in `BEACON_CONFIG`, defaulting
    /// to `config/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if loading or parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("BEACON_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Whether the selection cache is off, from config or the
    /// `DISABLE_RPC_CACHE` env var.
    #[must_use]
    pub fn cache_disabled(&self) -> bool {
        if self.gateway.disable_cache {
            return true;
        }
        std::env::var("DISABLE_RPC_CACHE").is_ok_and(|v| v == "true" || v == "1")
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.gateway.cache_ttl_ms)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway.probe_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway.request_timeout_ms)
    }

    /// Parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns a descriptive string if the address does not parse.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string on the first violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.gateway.cache_ttl_ms == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.gateway.probe_timeout_ms == 0 {
            return Err("Probe timeout must be greater than 0".to_string());
        }
        if self.gateway.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }
        if self.gateway.cache_key.is_empty() {
            return Err("Cache key must not be empty".to_string());
        }
        if self.server.bind_port == 0 {
            return Err("Bind port must be greater than 0".to_string());
        }
        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }
        if self.server.max_batch_size == 0 {
            return Err("Max batch size must be greater than 0".to_string());
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Logging level must be one of {LOG_LEVELS:?}, got '{}'",
                self.logging.level
            ));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }
        Ok(())
    }
}
