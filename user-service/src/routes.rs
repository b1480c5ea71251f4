//! Router assembly

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::{
    health::{health, readiness},
    state::AppState,
    users,
};

/// Build the application router with health probes and user endpoints
///
/// Transport middleware (tracing, CORS, timeouts) is added by [`crate::server::Server`].
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().middleware.body_limit_bytes();

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(readiness))
        .merge(users::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
