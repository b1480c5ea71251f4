//! SurrealDB connection helpers
//!
//! Supports runtime protocol selection via URL scheme:
//! - `ws://` / `wss://` - WebSocket connections
//! - `http://` / `https://` - HTTP connections
//! - `mem://` - In-process memory engine

use std::time::Duration;

use tokio::time::Instant;

use crate::config::StorageConfig;
use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Result};

/// SurrealDB client type alias using the `Any` engine for runtime protocol selection
pub type SurrealClient = surrealdb::Surreal<surrealdb::engine::any::Any>;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Connect to `url`, retrying with exponential backoff until `config.connect_timeout()` elapses.
///
/// A freshly spawned server needs a moment before it accepts connections, so a refused
/// attempt is retried while the deadline allows. Once the deadline passes the last error
/// is returned as a timeout.
pub(crate) async fn connect_within(url: &str, config: &StorageConfig) -> Result<SurrealClient> {
    let url_safe = sanitize_url(url);
    let deadline = Instant::now() + config.connect_timeout();
    let mut delay = INITIAL_BACKOFF;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        let outcome = tokio::time::timeout(remaining, try_connect(url, config)).await;
        match outcome {
            Ok(Ok(client)) => {
                tracing::info!(
                    "SurrealDB connected: url={}, ns={}, db={} (attempt {})",
                    url_safe,
                    config.namespace,
                    config.database,
                    attempt
                );
                return Ok(client);
            }
            Ok(Err(e)) => {
                let now = Instant::now();
                if now + delay >= deadline {
                    tracing::error!(
                        "Failed to connect to SurrealDB at {} after {} attempt(s): {}",
                        url_safe,
                        attempt,
                        e
                    );
                    return Err(e.into());
                }
                tracing::warn!(
                    "SurrealDB connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
            Err(_) => {
                tracing::error!(
                    "Timed out connecting to SurrealDB at {} after {:?}",
                    url_safe,
                    config.connect_timeout()
                );
                return Err(DatabaseError::timeout(
                    DatabaseOperation::Connect,
                    format!("No connection within {:?}", config.connect_timeout()),
                )
                .add_context(url_safe)
                .into());
            }
        }
    }
}

/// Single connection attempt: connect, sign in, select namespace and database
async fn try_connect(
    url: &str,
    config: &StorageConfig,
) -> std::result::Result<SurrealClient, DatabaseError> {
    let url_safe = sanitize_url(url);
    tracing::debug!("Connecting to SurrealDB: {}", url_safe);

    let client = surrealdb::engine::any::connect(url).await.map_err(|e| {
        database_error(DatabaseOperation::Connect, &e).add_context(url_safe.clone())
    })?;

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        if is_embedded(url) {
            tracing::debug!("Skipping signin for embedded engine");
        } else {
            signin(&client, username, password, &url_safe).await?;
        }
    }

    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            database_error(DatabaseOperation::Connect, &e).add_context(format!(
                "ns={} db={}",
                config.namespace, config.database
            ))
        })?;

    Ok(client)
}

async fn signin(
    client: &SurrealClient,
    username: &str,
    password: &str,
    url_safe: &str,
) -> std::result::Result<(), DatabaseError> {
    client
        .signin(surrealdb::opt::auth::Root { username, password })
        .await
        .map_err(|e| {
            database_error(DatabaseOperation::Connect, &e)
                .add_context(format!("signin at {}", url_safe))
        })?;
    Ok(())
}

/// The in-process engine has no users to sign in as
fn is_embedded(url: &str) -> bool {
    url.starts_with("mem://")
}

/// Convert a SurrealDB error into a structured database error
pub(crate) fn database_error(operation: DatabaseOperation, err: &surrealdb::Error) -> DatabaseError {
    let kind = match categorize(err) {
        DatabaseErrorKind::Other if operation == DatabaseOperation::Connect => {
            DatabaseErrorKind::ConnectionFailed
        }
        DatabaseErrorKind::Other => DatabaseErrorKind::QueryFailed,
        kind => kind,
    };
    DatabaseError::new(operation, kind, err.to_string())
}

/// Categorize a SurrealDB error by its message
fn categorize(err: &surrealdb::Error) -> DatabaseErrorKind {
    let err_str = err.to_string().to_lowercase();

    if err_str.contains("permission")
        || err_str.contains("not allowed")
        || err_str.contains("auth")
        || err_str.contains("credentials")
        || err_str.contains("signin")
    {
        DatabaseErrorKind::PermissionDenied
    } else if err_str.contains("connect")
        || err_str.contains("network")
        || err_str.contains("dns")
        || err_str.contains("refused")
    {
        DatabaseErrorKind::ConnectionFailed
    } else if err_str.contains("timeout") || err_str.contains("timed out") {
        DatabaseErrorKind::Timeout
    } else if err_str.contains("deserializ") || err_str.contains("invalid type") {
        DatabaseErrorKind::TypeConversion
    } else {
        DatabaseErrorKind::Other
    }
}

/// Sanitize connection URL for safe logging (remove credentials if present)
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
    }
    url.to_string()
}
