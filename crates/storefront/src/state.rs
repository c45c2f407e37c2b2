//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::MemoryStore;

use crate::checkout::{ProductCatalog, SimulatedProcessor};
use crate::config::StorefrontConfig;
use crate::middleware::SessionLocks;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Per-buyer checkout state
/// lives in the session store; the session locks serialize access to it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: ProductCatalog,
    processor: SimulatedProcessor,
    session_store: MemoryStore,
    session_locks: SessionLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `catalog` - Products offered at checkout
    #[must_use]
    pub fn new(config: StorefrontConfig, catalog: ProductCatalog) -> Self {
        let processor = SimulatedProcessor::new(config.submission_delay);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                processor,
                session_store: MemoryStore::default(),
                session_locks: SessionLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the payment processor.
    #[must_use]
    pub fn processor(&self) -> &SimulatedProcessor {
        &self.inner.processor
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session_store(&self) -> &MemoryStore {
        &self.inner.session_store
    }

    /// Get a reference to the per-session locks.
    #[must_use]
    pub fn session_locks(&self) -> &SessionLocks {
        &self.inner.session_locks
    }
}
