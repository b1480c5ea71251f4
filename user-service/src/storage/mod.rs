//! Document storage for user records
//!
//! [`UserStore`] owns the SurrealDB client for the lifetime of the service. It is created
//! once at startup with [`UserStore::connect`], shared through `AppState`, and torn down
//! with [`UserStore::disconnect`] during shutdown.

mod client;
mod strategy;

pub use client::{sanitize_url, SurrealClient};
pub use strategy::{
    describe_store, strategy_for, ConnectionStrategy, DisposableDatabase, ExternalDatabase,
    EMBEDDED_MEMORY_URL,
};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Result};
use crate::users::{NewUser, User};

/// Table holding user documents
pub const USERS_TABLE: &str = "users";

/// Document shape written to SurrealDB
#[derive(Debug, Serialize)]
struct UserDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_age: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_gender: Option<String>,
    created_at: String,
    updated_at: String,
    revision: u32,
}

/// Row shape read back from SurrealDB
#[derive(Debug, Deserialize)]
struct UserRow {
    record_id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_age: Option<Number>,
    #[serde(default)]
    user_gender: Option<String>,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    revision: u32,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> std::result::Result<Self, Self::Error> {
        let created_at = parse_timestamp(&row.record_id, &row.created_at)?;
        let updated_at = parse_timestamp(&row.record_id, &row.updated_at)?;

        Ok(User {
            id: row.record_id,
            user_name: row.user_name,
            user_age: row.user_age,
            user_gender: row.user_gender,
            created_at,
            updated_at,
            version: row.revision,
        })
    }
}

fn parse_timestamp(record_id: &str, raw: &str) -> std::result::Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::new(
                DatabaseOperation::Query,
                DatabaseErrorKind::TypeConversion,
                format!("Invalid timestamp '{}': {}", raw, e),
            )
            .add_context(format!("{}:{}", USERS_TABLE, record_id))
        })
}

/// Storage adapter for the `users` table
pub struct UserStore {
    client: RwLock<Option<SurrealClient>>,
    strategy: Mutex<Box<dyn ConnectionStrategy>>,
    target: String,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl UserStore {
    /// Connect using the strategy selected by `config.mode`
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        Self::connect_with(config, strategy_for(config)).await
    }

    /// Connect using an explicit strategy
    ///
    /// The strategy is released again if the connection cannot be established, so a failed
    /// startup never leaves a disposable server behind.
    pub async fn connect_with(
        config: &StorageConfig,
        mut strategy: Box<dyn ConnectionStrategy>,
    ) -> Result<Self> {
        match describe_store(config) {
            Some(store) => tracing::info!(
                strategy = strategy.name(),
                store = %store,
                "Connecting to document database"
            ),
            None => tracing::info!(strategy = strategy.name(), "Connecting to document database"),
        }

        let url = strategy.provision(config).await?;

        let client = match client::connect_within(&url, config).await {
            Ok(client) => client,
            Err(e) => {
                if let Err(release_err) = strategy.release().await {
                    tracing::warn!("Failed to release {} database: {}", strategy.name(), release_err);
                }
                return Err(e);
            }
        };

        if let Err(e) = define_schema(&client).await {
            if let Err(release_err) = strategy.release().await {
                tracing::warn!("Failed to release {} database: {}", strategy.name(), release_err);
            }
            return Err(e.into());
        }

        Ok(Self {
            client: RwLock::new(Some(client)),
            strategy: Mutex::new(strategy),
            target: sanitize_url(&url),
        })
    }

    /// Drop the client and release the strategy. Safe to call more than once.
    pub async fn disconnect(&self) -> Result<()> {
        let client = self.client.write().await.take();
        if client.is_some() {
            tracing::info!("Disconnecting from {}", self.target);
        }
        drop(client);

        self.strategy.lock().await.release().await.map_err(|e| {
            DatabaseError::new(
                DatabaseOperation::Disconnect,
                DatabaseErrorKind::Other,
                e.to_string(),
            )
            .add_context(self.target.clone())
            .into()
        })
    }

    /// Whether the store still holds a client
    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Sanitized URL the store is connected to
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Persist a new user and return the stored record
    pub async fn insert(&self, new_user: NewUser) -> Result<User> {
        let client = self.client(DatabaseOperation::Insert).await?;

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().trunc_subsecs(3);
        let timestamp = now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let document = UserDocument {
            user_name: new_user.user_name.clone(),
            user_age: new_user.user_age.clone(),
            user_gender: new_user.user_gender.clone(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
            revision: 0,
        };

        client
            .query("CREATE type::thing($table, $id) CONTENT $data")
            .bind(("table", USERS_TABLE))
            .bind(("id", id.clone()))
            .bind(("data", document))
            .await
            .and_then(|response| response.check())
            .map_err(|e| {
                client::database_error(DatabaseOperation::Insert, &e).add_context(USERS_TABLE)
            })?;

        tracing::debug!(id = %id, "Created user");

        Ok(User {
            id,
            user_name: new_user.user_name,
            user_age: new_user.user_age,
            user_gender: new_user.user_gender,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Every user in the table, in no particular order
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let client = self.client(DatabaseOperation::Query).await?;

        let mut response = client
            .query(
                "SELECT record::id(id) AS record_id, user_name, user_age, user_gender, \
                 created_at, updated_at, revision FROM type::table($table)",
            )
            .bind(("table", USERS_TABLE))
            .await
            .map_err(|e| {
                client::database_error(DatabaseOperation::Query, &e).add_context(USERS_TABLE)
            })?;

        let rows: Vec<UserRow> = response.take(0).map_err(|e| {
            client::database_error(DatabaseOperation::Query, &e).add_context(USERS_TABLE)
        })?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Round trip to the database
    pub async fn ping(&self) -> Result<()> {
        let client = self.client(DatabaseOperation::Query).await?;
        client
            .query("RETURN true")
            .await
            .and_then(|response| response.check())
            .map_err(|e| client::database_error(DatabaseOperation::Query, &e))?;
        Ok(())
    }

    async fn client(&self, operation: DatabaseOperation) -> Result<SurrealClient> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| DatabaseError::not_connected(operation).into())
    }
}

async fn define_schema(client: &SurrealClient) -> std::result::Result<(), DatabaseError> {
    client
        .query(format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS", USERS_TABLE))
        .await
        .and_then(|response| response.check())
        .map_err(|e| {
            client::database_error(DatabaseOperation::Connect, &e).add_context(USERS_TABLE)
        })?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    pub(crate) fn memory_config() -> StorageConfig {
        StorageConfig {
            url: EMBEDDED_MEMORY_URL.to_string(),
            namespace: "test".to_string(),
            database: "users".to_string(),
            ..StorageConfig::default()
        }
    }

    fn ana() -> NewUser {
        NewUser {
            user_name: Some("Ana".to_string()),
            user_age: Some(Number::from(30)),
            user_gender: Some("F".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = UserStore::connect(&memory_config()).await.unwrap();

        let user = store.insert(ana()).await.unwrap();
        assert!(!user.id.is_empty());
        assert_eq!(user.user_name.as_deref(), Some("Ana"));
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.version, 0);
    }

    #[tokio::test]
    async fn test_list_empty_table() {
        let store = UserStore::connect(&memory_config()).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_inserted_records() {
        let store = UserStore::connect(&memory_config()).await.unwrap();

        let mut created = HashSet::new();
        for _ in 0..3 {
            created.insert(store.insert(ana()).await.unwrap().id);
        }
        let partial = store
            .insert(NewUser {
                user_name: Some("Bo".to_string()),
                ..NewUser::default()
            })
            .await
            .unwrap();

        let users = store.list_all().await.unwrap();
        assert_eq!(users.len(), 4);
        assert_eq!(created.len(), 3);

        let listed: HashSet<_> = users.iter().map(|u| u.id.clone()).collect();
        assert!(created.is_subset(&listed));

        let bo = users.iter().find(|u| u.id == partial.id).unwrap();
        assert_eq!(bo, &partial);
        assert!(bo.user_age.is_none());
        assert!(bo.user_gender.is_none());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_numbers() {
        let store = UserStore::connect(&memory_config()).await.unwrap();
        let user = store
            .insert(NewUser {
                user_age: Number::from_f64(41.5),
                ..NewUser::default()
            })
            .await
            .unwrap();

        let users = store.list_all().await.unwrap();
        assert_eq!(users[0].id, user.id);
        assert_eq!(users[0].user_age, Number::from_f64(41.5));
    }

    #[tokio::test]
    async fn test_operations_fail_after_disconnect() {
        let store = UserStore::connect(&memory_config()).await.unwrap();
        store.disconnect().await.unwrap();
        assert!(!store.is_connected().await);

        let err = store.insert(NewUser::default()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Database(DatabaseError {
                kind: DatabaseErrorKind::NotConnected,
                operation: DatabaseOperation::Insert,
                ..
            })
        ));
        assert!(store.list_all().await.is_err());
        assert!(store.ping().await.is_err());

        // Second disconnect is a no-op
        assert!(store.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_disposable_embedded_store() {
        let config = StorageConfig {
            mode: crate::config::StorageMode::Disposable,
            ..memory_config()
        };
        let store = UserStore::connect(&config).await.unwrap();
        assert_eq!(store.target(), EMBEDDED_MEMORY_URL);
        store.insert(ana()).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        store.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_disposable_embedded_store_ignores_credentials() {
        let config = StorageConfig {
            mode: crate::config::StorageMode::Disposable,
            username: Some("root".to_string()),
            password: Some("root".to_string()),
            ..memory_config()
        };
        let store = UserStore::connect(&config).await.unwrap();
        store.insert(ana()).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    /// Embedded engine whose teardown always fails
    #[derive(Debug)]
    struct StuckRelease;

    #[async_trait::async_trait]
    impl ConnectionStrategy for StuckRelease {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn provision(&mut self, _config: &StorageConfig) -> Result<String> {
            Ok(EMBEDDED_MEMORY_URL.to_string())
        }

        async fn release(&mut self) -> Result<()> {
            Err(std::io::Error::other("process did not exit").into())
        }
    }

    #[tokio::test]
    async fn test_failed_release_is_a_disconnect_error() {
        let store = UserStore::connect_with(&memory_config(), Box::new(StuckRelease))
            .await
            .unwrap();

        let err = store.disconnect().await.unwrap_err();
        match err {
            crate::error::Error::Database(e) => {
                assert_eq!(e.operation, DatabaseOperation::Disconnect);
                assert!(e.message.contains("process did not exit"));
                assert_eq!(e.context.as_deref(), Some(EMBEDDED_MEMORY_URL));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!store.is_connected().await);
    }

    #[test]
    fn test_row_with_bad_timestamp_is_rejected() {
        let row = UserRow {
            record_id: "r1".to_string(),
            user_name: None,
            user_age: None,
            user_gender: None,
            created_at: "yesterday".to_string(),
            updated_at: "yesterday".to_string(),
            revision: 0,
        };
        let err = User::try_from(row).unwrap_err();
        assert_eq!(err.kind, DatabaseErrorKind::TypeConversion);
        assert_eq!(err.context.as_deref(), Some("users:r1"));
    }
}
