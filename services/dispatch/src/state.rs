//! Application state shared across request handlers.

use std::sync::Arc;

use lifeboat_catalog::Database;

use crate::allocator::AllocationEngine;
use crate::reconciler::RescueReconciler;

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
    allocator: AllocationEngine,
    reconciler: RescueReconciler,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, allocator: AllocationEngine, reconciler: RescueReconciler) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                allocator,
                reconciler,
            }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    /// Get a reference to the allocation engine.
    pub fn allocator(&self) -> &AllocationEngine {
        &self.inner.allocator
    }

    /// Get a reference to the rescue reconciler.
    pub fn reconciler(&self) -> &RescueReconciler {
        &self.inner.reconciler
    }
}
