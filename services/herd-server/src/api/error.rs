use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::DbError;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub code: String,
    pub request_id: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("https://herd.dev/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            code,
            request_id: "unknown".to_string(),
            retryable: false,
            details: None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails::new(status, code, message));
        Self { status, problem }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        if self.problem.instance.is_none() {
            self.problem.instance = Some(request_id.clone());
        }
        self.problem.request_id = request_id;
        self
    }

    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.problem.details = Some(details);
        self
    }

    pub fn retryable(mut self) -> Self {
        self.problem.retryable = true;
        self
    }

    pub fn code(&self) -> &str {
        &self.problem.code
    }
}

/// Maps a storage failure to a logged 500 with a caller-facing message.
///
/// Conflicts are not handled here; callers match those first.
pub fn internal_db_error<'a>(
    request_id: &'a str,
    message: &'static str,
) -> impl FnOnce(DbError) -> ApiError + 'a {
    move |e| {
        tracing::error!(error = %e, request_id = %request_id, "{message}");
        ApiError::internal("internal_error", message).with_request_id(request_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_fields() {
        let err = ApiError::conflict("tags_exhausted", "No available prefixes")
            .with_request_id("req_1")
            .retryable();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.problem.title, "Conflict");
        assert_eq!(err.problem.r#type, "https://herd.dev/problems/tags_exhausted");
        assert_eq!(err.problem.instance.as_deref(), Some("req_1"));
        assert!(err.problem.retryable);
        assert_eq!(err.code(), "tags_exhausted");
    }

    #[test]
    fn test_problem_content_type() {
        let response = ApiError::bad_request("invalid_group_count", "Invalid group count.")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn test_internal_db_error_hides_cause() {
        let request_id = String::from("req_db");
        let err = internal_db_error(&request_id, "Failed to list cattle")(DbError::Query(
            sqlx::Error::RowNotFound,
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.problem.detail, "Failed to list cattle");
        assert_eq!(err.problem.request_id, "req_db");
        assert!(!err.problem.retryable);
    }
}
