//! Application state shared across request handlers.

use std::sync::Arc;

use herd_tag::TagAllocator;

use crate::config::AuthConfig;
use crate::db::Database;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    allocator: TagAllocator,
    auth: AuthConfig,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, allocator: TagAllocator, auth: AuthConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                allocator,
                auth,
            }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// The tag allocator every add path goes through.
    pub fn allocator(&self) -> &TagAllocator {
        &self.inner.allocator
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.inner.auth
    }
}
