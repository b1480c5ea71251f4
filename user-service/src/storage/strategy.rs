//! Connection strategies selected by `storage.mode`
//!
//! A strategy decides where the database lives. It hands back the URL to connect to and
//! cleans up whatever it provisioned once the service shuts down.

use std::fmt;
use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::config::{DisposableConfig, StorageConfig, StorageMode};
use crate::error::{DatabaseError, Result};

/// URL of the in-process memory engine
pub const EMBEDDED_MEMORY_URL: &str = "mem://";

/// Where the database comes from and how it is torn down
#[async_trait]
pub trait ConnectionStrategy: Send + Sync + fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Prepare the target and return the URL to connect to
    async fn provision(&mut self, config: &StorageConfig) -> Result<String>;

    /// Release anything `provision` created. Must be safe to call more than once.
    async fn release(&mut self) -> Result<()>;
}

/// Build the strategy named by the configuration
pub fn strategy_for(config: &StorageConfig) -> Box<dyn ConnectionStrategy> {
    match config.mode {
        StorageMode::External => Box::new(ExternalDatabase::new(config.url.clone())),
        StorageMode::Disposable => Box::new(DisposableDatabase::new(config.disposable.clone())),
    }
}

/// An already running database at a fixed address
#[derive(Debug, Clone)]
pub struct ExternalDatabase {
    url: String,
}

impl ExternalDatabase {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ConnectionStrategy for ExternalDatabase {
    fn name(&self) -> &'static str {
        "external"
    }

    async fn provision(&mut self, _config: &StorageConfig) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A throwaway database owned by this process
///
/// With `binary` set, a `surreal start` server is spawned on a free loopback port and killed
/// on release (or when the strategy is dropped). Without it, the in-process memory engine is
/// used and data disappears with the client handle.
#[derive(Debug)]
pub struct DisposableDatabase {
    config: DisposableConfig,
    child: Option<Child>,
}

impl DisposableDatabase {
    pub fn new(config: DisposableConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    /// Whether a server process is currently running
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    async fn spawn_server(&mut self, binary: &Path, config: &StorageConfig) -> Result<String> {
        let host = self.config.bind_host.clone();
        let port = free_port(&host)?;

        let store = match &self.config.data_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                format!("rocksdb://{}", dir.display())
            }
            None => "memory".to_string(),
        };

        let mut command = Command::new(binary);
        command
            .arg("start")
            .arg("--bind")
            .arg(format!("{}:{}", host, port))
            .arg("--log")
            .arg("warn");

        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                command.arg("--user").arg(user).arg("--pass").arg(pass);
            }
            _ => {
                command.arg("--unauthenticated");
            }
        }

        command
            .arg(&store)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            DatabaseError::connection_failed(format!(
                "Failed to start disposable database '{}': {}",
                binary.display(),
                e
            ))
        })?;

        tracing::info!(
            pid = child.id(),
            store = %store,
            "Started disposable SurrealDB on {}:{}",
            host,
            port
        );

        self.child = Some(child);
        Ok(format!("ws://{}:{}", host, port))
    }
}

#[async_trait]
impl ConnectionStrategy for DisposableDatabase {
    fn name(&self) -> &'static str {
        "disposable"
    }

    async fn provision(&mut self, config: &StorageConfig) -> Result<String> {
        // Provisioning twice would orphan the first server
        self.release().await?;

        match self.config.binary.clone() {
            Some(binary) => self.spawn_server(&binary, config).await,
            None => {
                tracing::info!("Using embedded in-memory SurrealDB");
                Ok(EMBEDDED_MEMORY_URL.to_string())
            }
        }
    }

    async fn release(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            child.kill().await?;
            tracing::info!(pid, "Stopped disposable SurrealDB");
        }
        Ok(())
    }
}

/// Ask the OS for an unused port on `host`
fn free_port(host: &str) -> Result<u16> {
    let listener = TcpListener::bind((host, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Backing store of a disposable database, for logging. `None` in external mode.
pub fn describe_store(config: &StorageConfig) -> Option<String> {
    match config.mode {
        StorageMode::External => None,
        StorageMode::Disposable => Some(
            config
                .disposable
                .data_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_external_provision_returns_configured_url() {
        let config = StorageConfig {
            url: "ws://db.internal:8000".to_string(),
            ..StorageConfig::default()
        };
        let mut strategy = strategy_for(&config);
        assert_eq!(strategy.name(), "external");
        assert_eq!(strategy.provision(&config).await.unwrap(), "ws://db.internal:8000");
        assert!(strategy.release().await.is_ok());
    }

    #[tokio::test]
    async fn test_disposable_without_binary_uses_embedded_engine() {
        let config = StorageConfig {
            mode: StorageMode::Disposable,
            ..StorageConfig::default()
        };
        let mut strategy = DisposableDatabase::new(config.disposable.clone());
        assert_eq!(strategy.provision(&config).await.unwrap(), EMBEDDED_MEMORY_URL);
        assert!(!strategy.is_running());
        assert!(strategy.release().await.is_ok());
        assert!(strategy.release().await.is_ok());
    }

    #[tokio::test]
    async fn test_disposable_missing_binary_fails() {
        let mut config = StorageConfig {
            mode: StorageMode::Disposable,
            ..StorageConfig::default()
        };
        config.disposable.binary = Some(PathBuf::from("/nonexistent/bin/surreal"));

        let mut strategy = strategy_for(&config);
        assert_eq!(strategy.name(), "disposable");
        let err = strategy.provision(&config).await.unwrap_err();
        assert!(err.to_string().contains("Failed to start disposable database"));
    }

    #[test]
    fn test_free_port_is_nonzero() {
        assert_ne!(free_port("127.0.0.1").unwrap(), 0);
    }

    #[test]
    fn test_describe_store() {
        let mut config = StorageConfig::default();
        assert_eq!(describe_store(&config), None);

        config.mode = StorageMode::Disposable;
        assert_eq!(describe_store(&config).as_deref(), Some("memory"));
        config.disposable.data_dir = Some(PathBuf::from("/tmp/users"));
        assert_eq!(describe_store(&config).as_deref(), Some("/tmp/users"));
    }
}
