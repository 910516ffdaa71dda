//! Cattle endpoints.
//!
//! Every add request goes through the shared [`herd_tag::TagAllocator`]: the
//! handler snapshots the stored tags, computes a batch, and inserts the whole
//! batch in one transaction. A concurrent writer that wins a tag turns into a
//! retryable 409.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use herd_id::CattleId;
use serde::{Deserialize, Serialize};

use crate::age::{age_in_months, format_age};
use crate::api::authz::require_session;
use crate::api::error::{internal_db_error, ApiError, FieldError};
use crate::api::request_context::RequestContext;
use crate::db::{CattleRecord, CattleUpdate, DbError, Gender, NewCattle, TreatmentRecord};
use crate::state::AppState;

pub const PAGE_SIZE: i64 = 30;

/// Largest batch a single add request may ask for.
pub const MAX_GROUP_COUNT: i64 = 1000;

/// Follow-ups due within this window flag the animal as urgent.
const URGENT_FOLLOW_UP_DAYS: i64 = 7;

/// Age bounds reported for an empty page.
const EMPTY_AGE_RANGE: (i32, i32) = (0, 120);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cattle).post(create_cattle))
        .route("/breeds", get(list_breeds))
        .route("/bulk-delete", post(bulk_delete))
        .route(
            "/{tag}",
            get(get_cattle).patch(update_cattle).delete(delete_cattle),
        )
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListCattleQuery {
    pub search: Option<String>,
    /// Kept as text so a malformed page falls back to the first one.
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCattleRequest {
    pub gender: Gender,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub mass: Option<i32>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    /// Age in months on arrival.
    #[serde(default)]
    pub received_age: Option<i32>,
    /// Number of animals to add with the same attributes.
    #[serde(default)]
    pub group_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCattleRequest {
    pub gender: Gender,
    #[serde(default)]
    pub breed: String,
    pub mass: i32,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_age: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// An animal as shown in lists and detail views.
#[derive(Debug, Serialize)]
pub struct CattleItem {
    #[serde(flatten)]
    pub record: CattleRecord,
    pub treatments: Vec<TreatmentRecord>,
    pub age_months: i32,
    pub age: String,
    pub has_urgent_follow_up: bool,
}

impl CattleItem {
    pub fn new(record: CattleRecord, treatments: Vec<TreatmentRecord>, now: DateTime<Utc>) -> Self {
        let age_months = age_in_months(record.received_at, record.received_age, now);
        let window = Duration::days(URGENT_FOLLOW_UP_DAYS);
        let has_urgent_follow_up = treatments.iter().any(|t| t.follow_up_due(now, window));
        Self {
            record,
            treatments,
            age_months,
            age: format_age(age_months),
            has_urgent_follow_up,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListCattleResponse {
    pub items: Vec<CattleItem>,
    pub min_age_months: i32,
    pub max_age_months: i32,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct CreatedCattleResponse {
    pub items: Vec<CattleRecord>,
}

#[derive(Debug, Serialize)]
pub struct ListBreedsResponse {
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

// =============================================================================
// Helpers
// =============================================================================

/// Pages needed for `total` rows; always at least one.
fn total_pages(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

/// Parses a requested page, falling back to 1, and clamps it to the range.
fn resolve_page(requested: Option<&str>, total_pages: i64) -> i64 {
    requested
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .clamp(1, total_pages)
}

/// Min and max age over a page. Max is bumped when equal so a range slider
/// always has some width.
fn age_range(ages: impl IntoIterator<Item = i32>) -> (i32, i32) {
    let (min, max) = ages
        .into_iter()
        .fold(None, |acc: Option<(i32, i32)>, age| match acc {
            None => Some((age, age)),
            Some((lo, hi)) => Some((lo.min(age), hi.max(age))),
        })
        .unwrap_or(EMPTY_AGE_RANGE);

    if min == max {
        (min, max + 1)
    } else {
        (min, max)
    }
}

fn normalized_search(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

fn validate_group_count(group_count: Option<i64>) -> Result<usize, String> {
    let count = group_count.unwrap_or(1);
    if !(1..=MAX_GROUP_COUNT).contains(&count) {
        return Err("Invalid group count.".to_string());
    }
    usize::try_from(count).map_err(|_| "Invalid group count.".to_string())
}

fn non_negative(field: &str, value: Option<i32>, details: &mut Vec<FieldError>) {
    if value.is_some_and(|v| v < 0) {
        details.push(FieldError::new(field, format!("{field} cannot be negative")));
    }
}

pub(super) fn cattle_not_found(tag: &str, request_id: &str) -> ApiError {
    ApiError::not_found("cattle_not_found", format!("Cattle with tag '{tag}' not found"))
        .with_request_id(request_id)
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListCattleQuery>,
) -> Result<Json<ListCattleResponse>, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let search = normalized_search(query.search.as_deref());
    let store = state.db().cattle_store();

    let total = store
        .count(search)
        .await
        .map_err(internal_db_error(request_id, "Failed to count cattle"))?;
    let total_pages = total_pages(total);
    let page = resolve_page(query.page.as_deref(), total_pages);

    let records = store
        .page(search, PAGE_SIZE, (page - 1) * PAGE_SIZE)
        .await
        .map_err(internal_db_error(request_id, "Failed to list cattle"))?;

    let ids: Vec<CattleId> = records.iter().map(|r| r.id).collect();
    let treatments = state
        .db()
        .treatment_store()
        .for_cattle_many(&ids)
        .await
        .map_err(internal_db_error(request_id, "Failed to list treatments"))?;

    let mut by_cattle: HashMap<CattleId, Vec<TreatmentRecord>> = HashMap::new();
    for treatment in treatments {
        by_cattle.entry(treatment.cattle_id).or_default().push(treatment);
    }

    let now = Utc::now();
    let items: Vec<CattleItem> = records
        .into_iter()
        .map(|record| {
            let treatments = by_cattle.remove(&record.id).unwrap_or_default();
            CattleItem::new(record, treatments, now)
        })
        .collect();

    let (min_age_months, max_age_months) = age_range(items.iter().map(|i| i.age_months));

    Ok(Json(ListCattleResponse {
        items,
        min_age_months,
        max_age_months,
        page,
        total_pages,
        total,
    }))
}

async fn list_breeds(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<ListBreedsResponse>, ApiError> {
    require_session(&state, &ctx).await?;

    let items = state
        .db()
        .cattle_store()
        .breeds()
        .await
        .map_err(internal_db_error(&ctx.request_id, "Failed to list breeds"))?;

    Ok(Json(ListBreedsResponse { items }))
}

async fn create_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<CreateCattleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let count = validate_group_count(req.group_count).map_err(|message| {
        ApiError::bad_request("invalid_group_count", message).with_request_id(request_id)
    })?;

    let mut details = Vec::new();
    non_negative("mass", req.mass, &mut details);
    non_negative("received_age", req.received_age, &mut details);
    if !details.is_empty() {
        return Err(ApiError::bad_request("invalid_request", "Invalid cattle attributes")
            .with_request_id(request_id)
            .with_details(details));
    }

    let attrs = NewCattle {
        gender: req.gender,
        breed: req.breed.map(|b| b.trim().to_string()).unwrap_or_default(),
        mass: req.mass.unwrap_or(0),
        received_at: req.received_at.unwrap_or_else(Utc::now),
        received_age: req.received_age.unwrap_or(0),
    };

    let store = state.db().cattle_store();
    let existing = store
        .all_tags()
        .await
        .map_err(internal_db_error(request_id, "Failed to load existing tags"))?;

    let tags = state
        .allocator()
        .allocate(&existing, count)
        .map_err(|e| {
            if e.is_exhausted() {
                tracing::warn!(request_id = %request_id, count, "Tag space exhausted");
                ApiError::conflict("tags_exhausted", e.to_string()).with_request_id(request_id)
            } else {
                tracing::error!(error = %e, request_id = %request_id, "Allocator misconfigured");
                ApiError::internal("internal_error", "Failed to allocate tags")
                    .with_request_id(request_id)
            }
        })?;

    let created = store.insert_batch(&attrs, &tags).await.map_err(|e| match e {
        DbError::TagsExist(ref taken) => {
            tracing::warn!(request_id = %request_id, tags = ?taken, "Tag collision on insert");
            ApiError::conflict("tags_already_exist", e.to_string())
                .with_request_id(request_id)
                .retryable()
        }
        other => internal_db_error(request_id, "Failed to create cattle")(other),
    })?;

    tracing::info!(
        request_id = %request_id,
        user_id = %current.user.id,
        count = created.len(),
        first_tag = created.first().map(|c| c.tag_number.as_str()).unwrap_or_default(),
        "Cattle added"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedCattleResponse { items: created }),
    ))
}

async fn get_cattle(
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

async fn update_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(tag): Path<String>,
    Json(req): Json<UpdateCattleRequest>,
) -> Result<Json<CattleRecord>, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let mut details = Vec::new();
    non_negative("mass", Some(req.mass), &mut details);
    non_negative("received_age", req.received_age, &mut details);
    if !details.is_empty() {
        return Err(ApiError::bad_request("invalid_request", "Invalid cattle attributes")
            .with_request_id(request_id)
            .with_details(details));
    }

    let update = CattleUpdate {
        gender: req.gender,
        breed: req.breed.trim().to_string(),
        mass: req.mass,
        received_at: req.received_at,
        received_age: req.received_age,
    };

    let record = state
        .db()
        .cattle_store()
        .update_by_tag(&tag, &update)
        .await
        .map_err(internal_db_error(request_id, "Failed to update cattle"))?
        .ok_or_else(|| cattle_not_found(&tag, request_id))?;

    tracing::info!(request_id = %request_id, tag = %tag, "Cattle updated");
    Ok(Json(record))
}

async fn delete_cattle(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(tag): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    let deleted = state
        .db()
        .cattle_store()
        .delete_by_tag(&tag)
        .await
        .map_err(internal_db_error(request_id, "Failed to delete cattle"))?;

    if !deleted {
        return Err(cattle_not_found(&tag, request_id));
    }

    tracing::info!(request_id = %request_id, tag = %tag, "Cattle deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn bulk_delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    require_session(&state, &ctx).await?;
    let request_id = ctx.request_id.as_str();

    if req.ids.is_empty() {
        return Err(
            ApiError::bad_request("no_cattle_selected", "No cattle selected for deletion.")
                .with_request_id(request_id),
        );
    }

    let ids = parse_cattle_ids(&req.ids, request_id)?;

    let deleted = state
        .db()
        .cattle_store()
        .delete_many(&ids)
        .await
        .map_err(internal_db_error(request_id, "Failed to delete cattle"))?;

    tracing::info!(request_id = %request_id, requested = ids.len(), deleted, "Cattle bulk-deleted");
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Parses a list of `cat_` ids, reporting every malformed entry.
pub(super) fn parse_cattle_ids(raw: &[String], request_id: &str) -> Result<Vec<CattleId>, ApiError> {
    let mut ids = Vec::with_capacity(raw.len());
    let mut details = Vec::new();
    for (i, value) in raw.iter().enumerate() {
        match CattleId::parse(value) {
            Ok(id) => ids.push(id),
            Err(e) => details.push(FieldError::new(format!("ids[{i}]"), e.to_string())),
        }
    }

    if !details.is_empty() {
        return Err(ApiError::bad_request("invalid_id", "Invalid cattle id")
            .with_request_id(request_id)
            .with_details(details));
    }
    Ok(ids)
}
