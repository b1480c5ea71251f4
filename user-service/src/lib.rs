//! # user-service
//!
//! HTTP service that creates and lists user records stored in SurrealDB.
//!
//! ## Endpoints
//!
//! - `POST /api/add_users` - create a user from `user_name`, `user_age`, `user_gender`
//! - `GET /api/get_users` - list every stored user
//! - `GET /health`, `GET /ready` - liveness and readiness probes
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use user_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = Arc::new(UserStore::connect(&config.storage).await?);
//!     let app = router(AppState::new(config.clone(), store.clone()));
//!
//!     Server::new(config).serve(app).await?;
//!     store.disconnect().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod state;
pub mod storage;
pub mod users;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, StorageConfig, StorageMode};
    pub use crate::error::{DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::routes::router;
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::storage::{ConnectionStrategy, UserStore};
    pub use crate::users::{NewUser, User};
}
