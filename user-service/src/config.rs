//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `USER_SERVICE_`, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/user-service/config.toml
//! 4. System directory: /etc/user-service/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Application name used for config directories
pub const APP_NAME: &str = "user-service";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "USER_SERVICE_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Document database configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS mode (permissive, restrictive)
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
        }
    }
}

impl MiddlewareConfig {
    /// Body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}

/// How the service reaches its database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Connect to an already running database at `storage.url`
    External,
    /// Provision a throwaway local instance and connect to it
    Disposable,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Disposable => write!(f, "disposable"),
        }
    }
}

/// SurrealDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Connection strategy
    #[serde(default = "default_storage_mode")]
    pub mode: StorageMode,

    /// Connection URL for external mode (ws://, wss://, http://, https://, mem://)
    #[serde(default = "default_storage_url")]
    pub url: String,

    /// Namespace to select after connecting
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Database to select after connecting
    #[serde(default = "default_database")]
    pub database: String,

    /// Root username (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Root password (optional)
    #[serde(default)]
    pub password: Option<String>,

    /// Upper bound on establishing the initial connection, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Settings for the disposable instance
    #[serde(default)]
    pub disposable: DisposableConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: default_storage_mode(),
            url: default_storage_url(),
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout(),
            disposable: DisposableConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Connection deadline as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Disposable database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposableConfig {
    /// Path to the `surreal` server binary. When unset the embedded memory engine is used.
    #[serde(default)]
    pub binary: Option<PathBuf>,

    /// Data directory for the spawned server. When unset the server keeps data in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Host the spawned server binds to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
}

impl Default for DisposableConfig {
    fn default() -> Self {
        Self {
            binary: None,
            data_dir: None,
            bind_host: default_bind_host(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_body_limit_mb() -> usize {
    50
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_storage_mode() -> StorageMode {
    StorageMode::External
}

fn default_storage_url() -> String {
    "ws://127.0.0.1:8000".to_string()
}

fn default_namespace() -> String {
    "user_service".to_string()
}

fn default_database() -> String {
    "user_service".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found wins):
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/user-service/config.toml
    /// 3. System directory: /etc/user-service/config.toml
    ///
    /// Environment variables override all file-based configs.
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config: Config = figment.merge(Self::env_provider()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env_provider())
            .extract()?;

        Ok(config)
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Candidate config files, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);
        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(APP_NAME).join("config.toml"));

        paths
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.service.port == 0 {
            return Err(Error::InvalidConfig("service.port must be non-zero".to_string()));
        }
        if self.middleware.body_limit_mb == 0 {
            return Err(Error::InvalidConfig(
                "middleware.body_limit_mb must be non-zero".to_string(),
            ));
        }
        if self.storage.mode == StorageMode::External && self.storage.url.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.url is required in external mode".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_NAME.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 2000);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.middleware.body_limit_mb, 50);
        assert_eq!(config.storage.mode, StorageMode::External);
        assert_eq!(config.storage.connect_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_body_limit_bytes() {
        let config = MiddlewareConfig::default();
        assert_eq!(config.body_limit_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [service]
            name = "users-test"
            port = 3100

            [storage]
            mode = "disposable"
            namespace = "ns"

            [storage.disposable]
            data_dir = "/tmp/users-db"
            "#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "users-test");
        assert_eq!(config.service.port, 3100);
        assert_eq!(config.storage.mode, StorageMode::Disposable);
        assert_eq!(config.storage.namespace, "ns");
        assert_eq!(config.storage.database, "user_service");
        assert_eq!(
            config.storage.disposable.data_dir,
            Some(PathBuf::from("/tmp/users-db"))
        );
        assert!(config.storage.disposable.binary.is_none());
        assert_eq!(config.storage.disposable.bind_host, "127.0.0.1");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from("/nonexistent/user-service/config.toml").unwrap();
        assert_eq!(config.service.port, 2000);
    }

    #[test]
    fn test_validate_rejects_empty_external_url() {
        let mut config = Config::default();
        config.storage.url = "  ".to_string();
        assert!(config.validate().is_err());

        config.storage.mode = StorageMode::Disposable;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.service.port = 0;
        assert!(config.validate().is_err());
    }
}
