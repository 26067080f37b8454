use sqlx::PgPool;

use crate::config::Config;
use crate::storage::StorageLayout;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Every on-disk path derives from `config.storage_root` through this.
    pub storage: StorageLayout,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let storage = StorageLayout::new(config.storage_root.clone());
        AppState {
            db,
            config,
            storage,
        }
    }
}
