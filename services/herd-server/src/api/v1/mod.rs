//! API v1 routes.

mod auth;
mod cattle;
mod treatments;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/cattle", cattle::routes().merge(treatments::cattle_routes()))
        .nest("/treatments", treatments::routes())
}
