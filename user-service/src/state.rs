//! Application state management

use std::sync::Arc;

use crate::{config::Config, storage::UserStore};

/// Application state shared across handlers
///
/// Cloning is cheap; both fields are reference counted.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<UserStore>,
}

impl AppState {
    /// Create a new AppState around a connected store
    pub fn new(config: Config, store: Arc<UserStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the user store
    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }
}
