//! glitchd — a multi-tenant key-value daemon.
//!
//! Administrators provision named stores over an HTTPS/JSON admin plane
//! guarded by a single shared bearer key; tenants read/write/delete their
//! store's keys over a TLS-secured binary RPC plane guarded by a per-store
//! rotating token. All data is durably persisted in an embedded
//! transactional store.

pub mod admin;
pub mod config;
pub mod error;
pub mod interfaces;
pub mod metrics;
pub mod services;
pub mod store;
pub mod tenant;
pub mod tick;
pub mod tls;

use std::sync::Arc;

use crate::metrics::GlobalAggregator;
use crate::store::StoreRepository;

/// Shared state threaded through the admin router's extractors.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<StoreRepository>,
    pub global: Arc<GlobalAggregator>,
    pub admin_key: String,
}

impl AppState {
    pub fn new(repository: Arc<StoreRepository>, global: Arc<GlobalAggregator>, admin_key: String) -> Self {
        Self { repository, global, admin_key }
    }

    /// An in-memory-backed state for unit tests.
    #[cfg(test)]
    pub fn for_test(admin_key: &str) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("glitchd.db");
        std::mem::forget(dir);
        let repository = Arc::new(StoreRepository::load(db_path.to_str().unwrap()).unwrap());
        Self::new(repository, Arc::new(GlobalAggregator::new()), admin_key.to_string())
    }
}
