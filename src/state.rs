use std::sync::Arc;

use anyhow::Context;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::config::AppConfig;
use crate::db::{self, SqlitePool};
use crate::error::{AppError, AppResult};
use crate::scanner::{self, ScanResult};
use crate::storage::{LocalStorage, PaperStorage};

pub type CatalogConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Shared handles for request handlers: the record store pool, the paper
/// library and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn PaperStorage>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig, storage: Arc<dyn PaperStorage>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            storage,
        }
    }

    /// Creates the library folder, opens the migrated database and wires a
    /// [`LocalStorage`] rooted at `config.storage_path`.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.storage_path)
            .await
            .with_context(|| {
                format!(
                    "failed to create storage folder {}",
                    config.storage_path.display()
                )
            })?;

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        let storage: Arc<dyn PaperStorage> =
            Arc::new(LocalStorage::new(config.storage_path.clone()));
        Ok(Self::new(pool, config, storage))
    }

    pub fn db(&self) -> AppResult<CatalogConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }

    /// Reads the library first and only then takes a connection, so no pooled
    /// connection is held across file IO.
    pub async fn scan(&self) -> AppResult<ScanResult> {
        let batch = scanner::collect_papers(self.storage.as_ref()).await;
        let mut conn = self.db()?;
        Ok(scanner::apply_batch(&mut conn, batch)?)
    }
}
