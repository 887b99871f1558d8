//! Progress tracking for polling clients.
//!
//! Two backends share the [`ProgressTracker`] contract:
//!
//! - [`InMemoryProgressTracker`]: a mutex-guarded map, lost on restart.
//! - [`PersistedProgressTracker`]: reads and writes the run record, so
//!   any number of stateless processes observe the same progress.
//!
//! Both clamp to `0..=100`, never move progress backward and ignore
//! updates once a run is terminal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wardrobe_core::progress::{clamp_progress, ProgressRecord, PROGRESS_MAX};
use wardrobe_core::run::{RunRecord, RunStatus};
use wardrobe_core::store::RunStore;
use wardrobe_core::types::RunId;

use crate::error::ProgressError;

#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Start tracking a run at 0%.
    async fn create(&self, run_id: RunId) -> Result<(), ProgressError>;

    /// Raise progress to `progress` (clamped). Lower values are ignored.
    async fn update(&self, run_id: RunId, progress: i32) -> Result<(), ProgressError>;

    /// Mark the run complete at 100%.
    async fn mark_complete(&self, run_id: RunId) -> Result<(), ProgressError>;

    /// Mark the run complete with an error.
    async fn mark_error(&self, run_id: RunId, message: &str) -> Result<(), ProgressError>;

    /// `None` for an unknown run.
    async fn get(&self, run_id: RunId) -> Result<Option<ProgressRecord>, ProgressError>;

    /// One entry per requested id; unknown runs map to `None`.
    async fn get_many(
        &self,
        run_ids: &[RunId],
    ) -> Result<HashMap<RunId, Option<ProgressRecord>>, ProgressError>;
}

/// Single-process tracker guarded by one mutex.
#[derive(Default)]
pub struct InMemoryProgressTracker {
    records: Mutex<HashMap<RunId, ProgressRecord>>,
}

impl InMemoryProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<T>(
        &self,
        f: impl FnOnce(&mut HashMap<RunId, ProgressRecord>) -> T,
    ) -> Result<T, ProgressError> {
        let mut guard = self.records.lock().map_err(|_| ProgressError::Poisoned)?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl ProgressTracker for InMemoryProgressTracker {
    async fn create(&self, run_id: RunId) -> Result<(), ProgressError> {
        self.with_records(|records| {
            records.entry(run_id).or_insert_with(|| ProgressRecord::new(run_id));
        })
    }

    async fn update(&self, run_id: RunId, progress: i32) -> Result<(), ProgressError> {
        let progress = clamp_progress(progress);
        self.with_records(|records| {
            let record = records.entry(run_id).or_insert_with(|| ProgressRecord::new(run_id));
            if !record.is_complete && progress > record.progress {
                record.progress = progress;
            }
        })
    }

    async fn mark_complete(&self, run_id: RunId) -> Result<(), ProgressError> {
        self.with_records(|records| {
            let record = records.entry(run_id).or_insert_with(|| ProgressRecord::new(run_id));
            if !record.is_complete {
                record.progress = PROGRESS_MAX;
                record.is_complete = true;
                record.error = None;
            }
        })
    }

    async fn mark_error(&self, run_id: RunId, message: &str) -> Result<(), ProgressError> {
        self.with_records(|records| {
            let record = records.entry(run_id).or_insert_with(|| ProgressRecord::new(run_id));
            if !record.is_complete {
                record.is_complete = true;
                record.error = Some(message.to_string());
            }
        })
    }

    async fn get(&self, run_id: RunId) -> Result<Option<ProgressRecord>, ProgressError> {
        self.with_records(|records| records.get(&run_id).cloned())
    }

    async fn get_many(
        &self,
        run_ids: &[RunId],
    ) -> Result<HashMap<RunId, Option<ProgressRecord>>, ProgressError> {
        self.with_records(|records| {
            run_ids
                .iter()
                .map(|id| (*id, records.get(id).cloned()))
                .collect()
        })
    }
}

/// Tracker that keeps progress on the run record itself.
///
/// The read before each update only skips needless writes; the store
/// itself refuses to lower progress, so concurrent writers cannot move it
/// backward.
pub struct PersistedProgressTracker {
    store: Arc<dyn RunStore>,
}

impl PersistedProgressTracker {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }
}

fn record_from_run(run: &RunRecord) -> ProgressRecord {
    ProgressRecord {
        run_id: run.id,
        progress: run.progress_percent,
        is_complete: run.status.is_terminal(),
        error: match run.status {
            RunStatus::Failed => Some(
                run.error_message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
            _ => None,
        },
    }
}

#[async_trait]
impl ProgressTracker for PersistedProgressTracker {
    async fn create(&self, run_id: RunId) -> Result<(), ProgressError> {
        // A freshly created run row already starts at 0%.
        self.store.write_progress(run_id, 0).await?;
        Ok(())
    }

    async fn update(&self, run_id: RunId, progress: i32) -> Result<(), ProgressError> {
        let progress = clamp_progress(progress);
        let Some(run) = self.store.get_by_id(run_id).await? else {
            tracing::debug!(run_id, "Progress update for unknown run ignored");
            return Ok(());
        };
        if run.status.is_terminal() || progress <= run.progress_percent {
            return Ok(());
        }
        self.store.write_progress(run_id, progress).await?;
        Ok(())
    }

    async fn mark_complete(&self, run_id: RunId) -> Result<(), ProgressError> {
        // Completion status and outputs are written by `update_results`;
        // this only guarantees the 100% reading if that write raced ahead.
        self.store.write_progress(run_id, PROGRESS_MAX).await?;
        Ok(())
    }

    async fn mark_error(&self, run_id: RunId, message: &str) -> Result<(), ProgressError> {
        self.store.update_error(run_id, message).await?;
        Ok(())
    }

    async fn get(&self, run_id: RunId) -> Result<Option<ProgressRecord>, ProgressError> {
        Ok(self.store.get_by_id(run_id).await?.as_ref().map(record_from_run))
    }

    async fn get_many(
        &self,
        run_ids: &[RunId],
    ) -> Result<HashMap<RunId, Option<ProgressRecord>>, ProgressError> {
        let runs = self.store.get_many(run_ids).await?;
        let mut found: HashMap<RunId, ProgressRecord> =
            runs.iter().map(|run| (run.id, record_from_run(run))).collect();
        Ok(run_ids.iter().map(|id| (*id, found.remove(id))).collect())
    }
}
