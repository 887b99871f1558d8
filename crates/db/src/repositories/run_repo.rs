//! Repository for the `runs` table.
//!
//! Every terminal write is guarded by `status_id NOT IN (completed, failed)`
//! so a run reaches a terminal status exactly once.

use sqlx::PgPool;
use wardrobe_core::run::NewRun;
use wardrobe_core::types::DbId;

use crate::models::run::Run;
use crate::models::status::{RunStatus, StatusId};

/// Column list for `runs` queries.
const COLUMNS: &str = "\
    id, status_id, person_image_url, garment_image_url, preset_ids, \
    progress_percent, intermediate_outputs, outputs, error_message, \
    created_at, started_at, completed_at, updated_at";

/// Terminal statuses: completed, failed.
const TERMINAL_STATUSES: [StatusId; 2] = [RunStatus::Completed as StatusId, RunStatus::Failed as StatusId];

/// Provides persistence operations for pipeline runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert a new pending run.
    pub async fn create(pool: &PgPool, input: &NewRun) -> Result<Run, sqlx::Error> {
        let query = format!(
            "INSERT INTO runs (status_id, person_image_url, garment_image_url, preset_ids) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(RunStatus::Pending.id())
            .bind(&input.person_image_url)
            .bind(&input.garment_image_url)
            .bind(&input.preset_ids)
            .fetch_one(pool)
            .await
    }

    /// Move a pending run to running. Returns `false` if it was not pending.
    pub async fn mark_running(pool: &PgPool, run_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs SET status_id = $2, started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(run_id)
        .bind(RunStatus::Running.id())
        .bind(RunStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim the oldest pending run and mark it running.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` to prevent double-dispatch
    /// when multiple dispatcher instances are running.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Run>, sqlx::Error> {
        let query = format!(
            "UPDATE runs \
             SET status_id = $1, started_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM runs \
                 WHERE status_id = $2 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(RunStatus::Running.id())
            .bind(RunStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Raise the progress of a non-terminal run.
    ///
    /// Returns `false` if the run is missing, already terminal or already
    /// at or past `percent`.
    pub async fn update_progress(
        pool: &PgPool,
        run_id: DbId,
        percent: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs SET progress_percent = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($3) AND progress_percent < $2",
        )
        .bind(run_id)
        .bind(percent)
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a run completed with its outputs.
    pub async fn complete(
        pool: &PgPool,
        run_id: DbId,
        intermediate_outputs: &serde_json::Value,
        outputs: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs \
             SET status_id = $2, intermediate_outputs = $3, outputs = $4, \
                 progress_percent = 100, error_message = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($5)",
        )
        .bind(run_id)
        .bind(RunStatus::Completed.id())
        .bind(intermediate_outputs)
        .bind(outputs)
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a run failed with an error message.
    pub async fn fail(pool: &PgPool, run_id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id <> ALL($4)",
        )
        .bind(run_id)
        .bind(RunStatus::Failed.id())
        .bind(error)
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a run by its internal ID.
    pub async fn find_by_id(pool: &PgPool, run_id: DbId) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }

    /// Find several runs by ID. Missing IDs are simply absent.
    pub async fn find_many(pool: &PgPool, run_ids: &[DbId]) -> Result<Vec<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Run>(&query)
            .bind(run_ids)
            .fetch_all(pool)
            .await
    }
}
