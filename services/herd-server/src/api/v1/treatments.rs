//! Treatment endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use herd_id::TreatmentId;
use serde::{Deserialize, Serialize};

use super::cattle::{cattle_not_found, parse_cattle_ids, CattleItem};
use crate::api::authz::require_session;
use crate::api::error::{internal_db_error, ApiError};
use crate::api::request_context::RequestContext;
use crate::db::{NewTreatment, TreatmentRecord};
use crate::state::AppState;

const MISSING_INPUT: &str = "Missing cattle or treatment.";

/// Routes under `/cattle`, merged into the cattle router.
pub fn cattle_routes() -> Router<AppState> {
    Router::new().route(
        "/{tag}/treatments",
        get(list_for_cattle).post(create_for_cattle),
    )
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bulk", post(create_bulk))
        .route("/suggestions", get(suggestions))
        .route("/{treatment_id}/complete", post(complete))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTreatmentRequest {
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub follow_up: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkTreatmentRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub follow_up: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TreatmentListResponse {
    pub items: Vec<TreatmentRecord>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub items: Vec<String>,
}

fn missing_input(request_id: &str) -> ApiError {
    ApiError::bad_request("missing_treatment", MISSING_INPUT).with_request_id(request_id)
}

/// Trims the name; `None` when nothing is left.
fn treatment_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    (!name.is_empty()).then(|| name.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// The animal with its treatment history.
async fn list_for_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(tag): Path<String>,
) -> Result<Json<CattleItem>, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let record = state
        .db()
        .cattle_store()
        .find_by_tag(&tag)
        .await
        .map_err(internal_db_error(request_id, "Failed to get cattle"))?
        .ok_or_else(|| cattle_not_found(&tag, request_id))?;

    let treatments = state
        .db()
        .treatment_store()
        .for_cattle(&record.id)
        .await
        .map_err(internal_db_error(request_id, "Failed to list treatments"))?;

    Ok(Json(CattleItem::new(record, treatments, Utc::now())))
}

async fn create_for_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(tag): Path<String>,
    Json(req): Json<CreateTreatmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let Some(treatment) = treatment_name(&req.treatment) else {
        return Err(missing_input(request_id));
    };

    let record = state
        .db()
        .cattle_store()
        .find_by_tag(&tag)
        .await
        .map_err(internal_db_error(request_id, "Failed to get cattle"))?
        .ok_or_else(|| cattle_not_found(&tag, request_id))?;

    let new = NewTreatment {
        treatment,
        date: req.date.unwrap_or_else(Utc::now),
        follow_up: req.follow_up,
    };

    let created = state
        .db()
        .treatment_store()
        .insert(&record.id, &new)
        .await
        .map_err(internal_db_error(request_id, "Failed to create treatment"))?;

    tracing::info!(
        request_id = %request_id,
        tag = %tag,
        treatment_id = %created.id,
        "Treatment logged"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

async fn create_bulk(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<BulkTreatmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let treatment = match treatment_name(&req.treatment) {
        Some(name) if !req.ids.is_empty() => name,
        _ => return Err(missing_input(request_id)),
    };

    let ids = parse_cattle_ids(&req.ids, request_id)?;

    let new = NewTreatment {
        treatment,
        date: req.date.unwrap_or_else(Utc::now),
        follow_up: req.follow_up,
    };

    let items = state
        .db()
        .treatment_store()
        .insert_bulk(&ids, &new)
        .await
        .map_err(internal_db_error(request_id, "Failed to create treatments"))?;

    if items.is_empty() {
        return Err(
            ApiError::not_found("cattle_not_found", "None of the selected cattle exist")
                .with_request_id(request_id),
        );
    }

    tracing::info!(
        request_id = %request_id,
        requested = ids.len(),
        created = items.len(),
        "Bulk treatment logged"
    );

    Ok((StatusCode::CREATED, Json(TreatmentListResponse { items })))
}

async fn complete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(treatment_id): Path<String>,
) -> Result<Json<TreatmentRecord>, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let not_found = || {
        ApiError::not_found("treatment_not_found", "Treatment not found")
            .with_request_id(request_id)
    };

    // A malformed id cannot name a stored treatment.
    let treatment_id = TreatmentId::parse(&treatment_id).map_err(|_| not_found())?;

    let record = state
        .db()
        .treatment_store()
        .complete(&treatment_id)
        .await
        .map_err(internal_db_error(request_id, "Failed to complete treatment"))?
        .ok_or_else(not_found)?;

    tracing::info!(request_id = %request_id, treatment_id = %treatment_id, "Treatment completed");
    Ok(Json(record))
}

/// Previously used treatment names, for the entry form.
async fn suggestions(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    require_session(&state, &ctx).await?;

    let items = state
        .db()
        .treatment_store()
        .names()
        .await
        .map_err(internal_db_error(&ctx.request_id, "Failed to list treatment names"))?;

    Ok(Json(SuggestionsResponse { items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_name_trims() {
        assert_eq!(treatment_name("  Dip "), Some("Dip".to_string()));
        assert_eq!(treatment_name("   "), None);
        assert_eq!(treatment_name(""), None);
    }

    #[test]
    fn test_missing_input_message() {
        let err = missing_input("req_1");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.problem.detail, "Missing cattle or treatment.");
    }
}
