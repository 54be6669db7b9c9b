use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::{AppConfig, SnapshotMode};
use crate::db;
use crate::snapshots::store::{SnapshotStore, SqliteSnapshotStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    /// Fresh in-memory database with migrations applied. Used by tests.
    pub async fn in_memory(mode: SnapshotMode) -> anyhow::Result<Self> {
        Self::from_config(AppConfig::in_memory(mode)).await
    }

    async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url, config.max_connections).await?;
        db::migrate(&db).await?;

        let store = Arc::new(SqliteSnapshotStore::open(db.clone(), config.snapshot_mode).await?)
            as Arc<dyn SnapshotStore>;

        Ok(Self::from_parts(db, Arc::new(config), store))
    }

    pub fn from_parts(db: SqlitePool, config: Arc<AppConfig>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { db, config, store }
    }
}
