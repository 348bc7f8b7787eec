//! Application context shared by all request handlers via Axum state.

use std::sync::Arc;

use tc_catalog::CatalogStore;
use tc_core::config::Config;

use crate::auth::{self, AuthGate};

/// Cheaply cloneable: only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Published catalog snapshot.
    pub catalog: Arc<CatalogStore>,
    /// Bearer credential verifier.
    pub auth: Arc<dyn AuthGate>,
}

impl AppContext {
    /// Build a context with the auth gate described by `config.auth`.
    pub fn new(config: Config, catalog: CatalogStore) -> Self {
        let auth = auth::build_gate(&config.auth);
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            auth,
        }
    }
}
