//! Email/password authentication endpoints.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::authz::require_session;
use crate::api::error::{internal_db_error, ApiError, FieldError};
use crate::api::request_context::RequestContext;
use crate::api::sessions::{self, clear_session_cookie, hash_token};
use crate::db::{DbError, UserRecord};
use crate::password::{self, PasswordError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/session", get(current_session))
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserRecord,
    pub session: SessionInfo,
    /// Only returned on sign-up and sign-in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Runs argon2 off the async executor.
async fn blocking<T, F>(request_id: &str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, request_id = %request_id, "Password task failed");
        ApiError::internal("internal_error", "Password check failed").with_request_id(request_id)
    })?;

    result.map_err(|e| match e {
        PasswordError::InvalidLength => ApiError::bad_request("invalid_request", e.to_string())
            .with_request_id(request_id)
            .with_details(vec![FieldError::new("password", e.to_string())]),
        PasswordError::Hash(_) => {
            tracing::error!(error = %e, request_id = %request_id, "Password hashing failed");
            ApiError::internal("internal_error", "Password check failed")
                .with_request_id(request_id)
        }
    })
}

async fn sign_up(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();

    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();

    let mut details = Vec::new();
    if name.is_empty() {
        details.push(FieldError::new("name", "name cannot be empty"));
    }
    if !email.contains('@') {
        details.push(FieldError::new("email", "email must be a valid address"));
    }
    if let Err(e) = password::validate(&req.password) {
        details.push(FieldError::new("password", e.to_string()));
    }
    if !details.is_empty() {
        return Err(ApiError::bad_request("invalid_request", "Invalid sign-up request")
            .with_request_id(request_id)
            .with_details(details));
    }

    let password = req.password;
    let password_hash = blocking(&request_id, move || password::hash(&password)).await?;

    let user = state
        .db()
        .user_store()
        .create(&name, &email, &password_hash)
        .await
        .map_err(|e| match e {
            DbError::EmailTaken => {
                ApiError::conflict("email_taken", "An account with this email already exists")
                    .with_request_id(request_id.clone())
            }
            other => internal_db_error(&request_id, "Failed to create user")(other),
        })?;

    tracing::info!(request_id = %request_id, user_id = %user.id, "User signed up");

    let issued = sessions::issue(&state, &user.id, &ctx).await?;
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, issued.cookie)],
        Json(AuthResponse {
            user,
            session: SessionInfo {
                expires_at: issued.session.expires_at,
            },
            token: Some(issued.token),
        }),
    ))
}

async fn sign_in(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();
    let invalid = || {
        ApiError::unauthorized("invalid_credentials", "Invalid email or password")
            .with_request_id(request_id.clone())
    };

    let found = state
        .db()
        .user_store()
        .find_credentials(req.email.trim())
        .await
        .map_err(internal_db_error(&request_id, "Failed to look up user"))?;

    let Some((user, stored_hash)) = found else {
        tracing::info!(request_id = %request_id, "Sign-in for unknown email");
        return Err(invalid());
    };

    let password = req.password;
    let matches = blocking(&request_id, move || password::verify(&password, &stored_hash)).await?;
    if !matches {
        tracing::info!(request_id = %request_id, user_id = %user.id, "Sign-in with wrong password");
        return Err(invalid());
    }

    let issued = sessions::issue(&state, &user.id, &ctx).await?;
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, issued.cookie)],
        Json(AuthResponse {
            user,
            session: SessionInfo {
                expires_at: issued.session.expires_at,
            },
            token: Some(issued.token),
        }),
    ))
}

/// Revokes the presented session. Always clears the cookie.
async fn sign_out(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = ctx.session_token.as_deref() {
        let revoked = state
            .db()
            .session_store()
            .revoke(&hash_token(token))
            .await
            .map_err(internal_db_error(&ctx.request_id, "Failed to sign out"))?;
        tracing::info!(request_id = %ctx.request_id, revoked, "Sign-out");
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_session_cookie(state.auth().secure_cookies))],
    ))
}

async fn current_session(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<AuthResponse>, ApiError> {
    let current = require_session(&state, &ctx).await?;
    Ok(Json(AuthResponse {
        user: current.user,
        session: SessionInfo {
            expires_at: current.session.expires_at,
        },
        token: None,
    }))
}
