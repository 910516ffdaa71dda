//! Request-scoped context extracted from HTTP requests.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use herd_id::RequestId;

use crate::api::error::ApiError;
use crate::api::sessions::SESSION_COOKIE;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Raw session token from `Authorization: Bearer` or the session cookie.
    pub session_token: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn header_string(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Finds `name` among all `Cookie` headers.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap, request_id: &str) -> Result<Option<String>, ApiError> {
    let Some(auth_value) = header_string(headers, AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_value = auth_value.trim();
    let Some(token) = auth_value.strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized(
            "invalid_authorization",
            "Authorization must be a Bearer token",
        )
        .with_request_id(request_id.to_string()));
    };

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized(
            "invalid_authorization",
            "Authorization Bearer token cannot be empty",
        )
        .with_request_id(request_id.to_string()));
    }

    Ok(Some(token.to_string()))
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = header_string(&parts.headers, REQUEST_ID_HEADER)
            .unwrap_or_else(|| RequestId::new().to_string());

        // An explicit Authorization header wins over the cookie.
        let session_token = match bearer_token(&parts.headers, &request_id)? {
            Some(token) => Some(token),
            None => cookie_value(&parts.headers, SESSION_COOKIE),
        };

        let ip_address = header_string(&parts.headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty());

        Ok(Self {
            request_id,
            session_token,
            ip_address,
            user_agent: header_string(&parts.headers, USER_AGENT),
        })
    }
}
