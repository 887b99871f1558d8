//! Collaborator wiring from the environment.
//!
//! `DATABASE_URL` selects the deployment shape:
//!
//! - set: PostgreSQL run store and preset catalog, progress persisted on
//!   the run record so any process can answer progress queries.
//! - unset: in-memory run store and progress tracker, presets loaded from
//!   `PRESET_CATALOG_PATH` (or none). Single process only.
//!
//! `STORAGE_BUCKET` likewise selects S3-compatible storage over
//! in-memory storage.

use std::sync::Arc;

use wardrobe_core::store::{ObjectStorage, PresetCatalog, RunStore, StorageError, StoreError};
use wardrobe_db::{DbPool, InMemoryRunStore, PgPresetCatalog, PgRunStore, StaticPresetCatalog};
use wardrobe_pipeline::{
    FanOut, InMemoryProgressTracker, PersistedProgressTracker, PipelineConfig, PipelineDriver,
    PipelineStages, ProgressTracker,
};
use wardrobe_providers::ProviderError;
use wardrobe_storage::{MemoryStorage, S3Storage, StorageConfig};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Everything a driver and the HTTP boundary share.
#[derive(Clone)]
pub struct Collaborators {
    /// Present in the PostgreSQL deployment.
    pub pool: Option<DbPool>,
    pub store: Arc<dyn RunStore>,
    pub catalog: Arc<dyn PresetCatalog>,
    pub tracker: Arc<dyn ProgressTracker>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Collaborators {
    /// Build collaborators from environment variables.
    pub async fn from_env() -> Result<Self, RuntimeError> {
        let storage = storage_from_env().await?;
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let pool = wardrobe_db::create_pool(&url).await?;
                tracing::info!("Database connection pool created");
                wardrobe_db::health_check(&pool).await?;
                tracing::info!("Database health check passed");
                wardrobe_db::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");
                Ok(Self::postgres(pool, storage))
            }
            _ => {
                let catalog = match std::env::var("PRESET_CATALOG_PATH") {
                    Ok(path) => StaticPresetCatalog::from_json_file(path)?,
                    Err(_) => {
                        tracing::warn!("PRESET_CATALOG_PATH not set, no presets will match");
                        StaticPresetCatalog::default()
                    }
                };
                tracing::info!("DATABASE_URL not set, using in-memory run store");
                Ok(Self::in_memory(catalog, storage))
            }
        }
    }

    /// PostgreSQL store and catalog, progress kept on the run record.
    pub fn postgres(pool: DbPool, storage: Arc<dyn ObjectStorage>) -> Self {
        let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
        Self {
            catalog: Arc::new(PgPresetCatalog::new(pool.clone())),
            tracker: Arc::new(PersistedProgressTracker::new(Arc::clone(&store))),
            store,
            storage,
            pool: Some(pool),
        }
    }

    /// Single-process collaborators.
    pub fn in_memory(catalog: StaticPresetCatalog, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            pool: None,
            store: Arc::new(InMemoryRunStore::new()),
            catalog: Arc::new(catalog),
            tracker: Arc::new(InMemoryProgressTracker::new()),
            storage,
        }
    }

    /// Wire the provider-backed pipeline over these collaborators.
    pub fn build_driver(&self, config: &PipelineConfig) -> Result<PipelineDriver, RuntimeError> {
        let missing = config.missing_credentials();
        if !missing.is_empty() {
            tracing::warn!(?missing, "Provider credentials missing, runs will fail at the first provider call");
        }
        let stages = PipelineStages::from_config(
            config,
            Arc::clone(&self.catalog),
            Arc::clone(&self.storage),
        )?;
        Ok(PipelineDriver::new(
            stages,
            FanOut::new(config.fan_out_max_concurrency),
            Arc::clone(&self.store),
            Arc::clone(&self.tracker),
        ))
    }
}

async fn storage_from_env() -> Result<Arc<dyn ObjectStorage>, RuntimeError> {
    let config = StorageConfig::from_env();
    if config.bucket.is_some() {
        Ok(Arc::new(S3Storage::connect(config).await?))
    } else {
        tracing::warn!("STORAGE_BUCKET not set, images are kept in memory");
        Ok(Arc::new(MemoryStorage::default()))
    }
}
