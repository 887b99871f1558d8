//! PostgreSQL implementations of the core persistence seams.

use async_trait::async_trait;
use wardrobe_core::outputs::IntermediateOutputs;
use wardrobe_core::preset::{order_by_request, PresetDetail, SubjectCategory};
use wardrobe_core::run::{ImageRef, NewRun, RunRecord};
use wardrobe_core::store::{PresetCatalog, RunStore, StoreError};
use wardrobe_core::types::{PresetId, RunId};

use crate::repositories::{PresetRepo, RunRepo};
use crate::DbPool;

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// [`RunStore`] backed by the `runs` table.
#[derive(Clone)]
pub struct PgRunStore {
    pool: DbPool,
}

impl PgRunStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_pending(&self, input: &NewRun) -> Result<RunRecord, StoreError> {
        let row = RunRepo::create(&self.pool, input).await.map_err(db_err)?;
        RunRecord::try_from(row)
    }

    async fn mark_running(&self, run_id: RunId) -> Result<bool, StoreError> {
        RunRepo::mark_running(&self.pool, run_id).await.map_err(db_err)
    }

    async fn claim_next_pending(&self) -> Result<Option<RunRecord>, StoreError> {
        RunRepo::claim_next(&self.pool)
            .await
            .map_err(db_err)?
            .map(RunRecord::try_from)
            .transpose()
    }

    async fn write_progress(&self, run_id: RunId, progress: i16) -> Result<(), StoreError> {
        let updated = RunRepo::update_progress(&self.pool, run_id, progress)
            .await
            .map_err(db_err)?;
        if !updated {
            tracing::debug!(run_id, progress, "Progress write ignored (run missing or terminal)");
        }
        Ok(())
    }

    async fn update_results(
        &self,
        run_id: RunId,
        intermediate_outputs: &IntermediateOutputs,
        outputs: &[ImageRef],
    ) -> Result<bool, StoreError> {
        let intermediate = serde_json::to_value(intermediate_outputs)?;
        let outputs = serde_json::to_value(outputs)?;
        RunRepo::complete(&self.pool, run_id, &intermediate, &outputs)
            .await
            .map_err(db_err)
    }

    async fn update_error(&self, run_id: RunId, message: &str) -> Result<bool, StoreError> {
        RunRepo::fail(&self.pool, run_id, message).await.map_err(db_err)
    }

    async fn get_by_id(&self, run_id: RunId) -> Result<Option<RunRecord>, StoreError> {
        RunRepo::find_by_id(&self.pool, run_id)
            .await
            .map_err(db_err)?
            .map(RunRecord::try_from)
            .transpose()
    }

    async fn get_many(&self, run_ids: &[RunId]) -> Result<Vec<RunRecord>, StoreError> {
        RunRepo::find_many(&self.pool, run_ids)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(RunRecord::try_from)
            .collect()
    }
}

/// [`PresetCatalog`] backed by the `preset_details` table.
#[derive(Clone)]
pub struct PgPresetCatalog {
    pool: DbPool,
}

impl PgPresetCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresetCatalog for PgPresetCatalog {
    async fn get_details_by_ids_and_category(
        &self,
        ids: &[PresetId],
        category: SubjectCategory,
    ) -> Result<Vec<PresetDetail>, StoreError> {
        let rows = PresetRepo::find_by_ids_and_category(&self.pool, ids, category)
            .await
            .map_err(db_err)?;
        let details = rows
            .into_iter()
            .map(PresetDetail::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(order_by_request(ids, details))
    }
}
