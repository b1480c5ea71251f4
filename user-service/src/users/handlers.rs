//! Route handlers for user records

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    Form, Json,
};

use super::model::{NewUser, User, UserCreated};
use crate::error::{Error, Result};
use crate::state::AppState;

/// Create-user body, read as JSON or as an urlencoded form
///
/// Requests without a recognised content type are treated as carrying no fields, as is an
/// empty JSON body.
#[derive(Debug)]
pub struct UserPayload(pub NewUser);

impl<S> FromRequest<S> for UserPayload
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(user) = Form::<NewUser>::from_request(req, state).await?;
            return Ok(Self(user));
        }

        if is_json(&content_type) {
            let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    Error::PayloadTooLarge(rejection.body_text())
                } else {
                    Error::BadRequest(rejection.body_text())
                }
            })?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Self(NewUser::default()));
            }
            let Json(user) = Json::<NewUser>::from_bytes(&bytes)?;
            return Ok(Self(user));
        }

        tracing::debug!(content_type = %content_type, "Ignoring body with unrecognised content type");
        Ok(Self(NewUser::default()))
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// POST /api/add_users
pub async fn create_user(
    State(state): State<AppState>,
    UserPayload(new_user): UserPayload,
) -> Result<(StatusCode, Json<UserCreated>)> {
    let user = state.store().insert(new_user).await?;
    tracing::info!(id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(UserCreated::new(user))))
}

/// GET /api/get_users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let users = state.store().list_all().await?;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/vnd.api+json"));
        assert!(!is_json("text/plain"));
        assert!(!is_json("application/x-www-form-urlencoded"));
        assert!(!is_json(""));
    }
}
