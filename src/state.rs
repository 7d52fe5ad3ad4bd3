use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;

/// Built once at startup and shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
        }
    }
}
