//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Store;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; handlers build services from [`AppState::store`]
/// per request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
}

impl AppState {
    /// Create a new application state over a persistence backend.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }
}
