//! Application state shared across request handlers.

use std::sync::Arc;

use lifeboat_catalog::Database;

use crate::engine::RankingEngine;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor; it
/// replaces the process-wide singleton the service historically used.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    engine: Arc<RankingEngine>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, engine: Arc<RankingEngine>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db, engine }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the ranking engine.
    pub fn engine(&self) -> &RankingEngine {
        &self.inner.engine
    }
}
