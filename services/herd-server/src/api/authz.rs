//! Session gate for herd routes.

use crate::api::error::{internal_db_error, ApiError};
use crate::api::request_context::RequestContext;
use crate::api::sessions::{hash_token, SESSION_TOKEN_PREFIX};
use crate::db::{SessionRecord, UserRecord};
use crate::state::AppState;

/// The signed-in caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserRecord,
    pub session: SessionRecord,
}

/// Resolves the caller's session or fails with 401.
pub async fn require_session(state: &AppState, ctx: &RequestContext) -> Result<CurrentUser, ApiError> {
    let request_id = &ctx.request_id;

    let Some(token) = ctx.session_token.as_deref() else {
        return Err(ApiError::unauthorized("unauthorized", "Sign in required")
            .with_request_id(request_id.clone()));
    };

    if !token.starts_with(SESSION_TOKEN_PREFIX) {
        return Err(
            ApiError::unauthorized("invalid_session", "Invalid session token format")
                .with_request_id(request_id.clone()),
        );
    }

    let found = state
        .db()
        .session_store()
        .find_active(&hash_token(token))
        .await
        .map_err(internal_db_error(request_id, "Failed to authorize request"))?;

    let Some((session, user)) = found else {
        return Err(
            ApiError::unauthorized("invalid_session", "Session is invalid or has expired")
                .with_request_id(request_id.clone()),
        );
    };

    Ok(CurrentUser { user, session })
}
