use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::auth::dtos::ErrorResponse;

/// Header carrying the opaque id of the user a request acts for.
pub const USER_ID_HEADER: &str = "x-later-user-id";

/// The user a request acts for. Accounts are managed elsewhere; the id is
/// taken as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaterUser {
    pub user_id: Uuid,
}

impl LaterUser {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

impl<S> FromRequestParts<S> for LaterUser
where
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(UserError::MissingUserId)?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(UserError::InvalidUserId)?;

        Ok(LaterUser::new(user_id))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum UserError {
    MissingUserId,
    InvalidUserId,
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let message = match self {
            UserError::MissingUserId => "Missing user id",
            UserError::InvalidUserId => "Invalid user id",
        };

        (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
    }
}
