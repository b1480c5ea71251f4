//! User records: types, payload casting and HTTP handlers

mod coerce;
pub mod handlers;
pub mod model;

pub use handlers::{create_user, list_users, UserPayload};
pub use model::{NewUser, User, UserCreated};

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Path of the create endpoint
pub const ADD_USERS_PATH: &str = "/api/add_users";

/// Path of the list endpoint
pub const GET_USERS_PATH: &str = "/api/get_users";

/// Routes for the user endpoints
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(ADD_USERS_PATH, post(create_user))
        .route(GET_USERS_PATH, get(list_users))
}
