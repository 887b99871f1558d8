//! In-memory persistence for the single-process deployment and tests.
//!
//! Runs are lost on restart. The same terminal-once rules as the
//! PostgreSQL store apply.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use wardrobe_core::outputs::IntermediateOutputs;
use wardrobe_core::preset::{order_by_request, PresetDetail, SubjectCategory};
use wardrobe_core::progress::PROGRESS_MAX;
use wardrobe_core::run::{ImageRef, NewRun, RunRecord, RunStatus};
use wardrobe_core::store::{PresetCatalog, RunStore, StoreError};
use wardrobe_core::types::{PresetId, RunId};

#[derive(Default)]
struct Runs {
    next_id: RunId,
    by_id: BTreeMap<RunId, RunRecord>,
}

/// [`RunStore`] held in a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryRunStore {
    inner: Mutex<Runs>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_runs<T>(&self, f: impl FnOnce(&mut Runs) -> T) -> Result<T, StoreError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StoreError::Database("run store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }

    /// Apply a terminal transition if the run exists and is not terminal.
    fn finish(
        &self,
        run_id: RunId,
        next: RunStatus,
        apply: impl FnOnce(&mut RunRecord),
    ) -> Result<bool, StoreError> {
        self.with_runs(|runs| match runs.by_id.get_mut(&run_id) {
            Some(run) if run.status.can_transition_to(next) => {
                run.status = next;
                run.completed_at = Some(Utc::now());
                apply(run);
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_pending(&self, input: &NewRun) -> Result<RunRecord, StoreError> {
        self.with_runs(|runs| {
            runs.next_id += 1;
            let record = RunRecord {
                id: runs.next_id,
                status: RunStatus::Pending,
                person_image_url: input.person_image_url.clone(),
                garment_image_url: input.garment_image_url.clone(),
                preset_ids: input.preset_ids.clone(),
                progress_percent: 0,
                intermediate_outputs: None,
                outputs: Vec::new(),
                error_message: None,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
            };
            runs.by_id.insert(record.id, record.clone());
            record
        })
    }

    async fn mark_running(&self, run_id: RunId) -> Result<bool, StoreError> {
        self.with_runs(|runs| match runs.by_id.get_mut(&run_id) {
            Some(run) if run.status == RunStatus::Pending => {
                run.status = RunStatus::Running;
                run.started_at = Some(Utc::now());
                true
            }
            _ => false,
        })
    }

    async fn claim_next_pending(&self) -> Result<Option<RunRecord>, StoreError> {
        self.with_runs(|runs| {
            let run = runs
                .by_id
                .values_mut()
                .find(|run| run.status == RunStatus::Pending)?;
            run.status = RunStatus::Running;
            run.started_at = Some(Utc::now());
            Some(run.clone())
        })
    }

    async fn write_progress(&self, run_id: RunId, progress: i16) -> Result<(), StoreError> {
        self.with_runs(|runs| {
            if let Some(run) = runs.by_id.get_mut(&run_id) {
                if !run.status.is_terminal() && progress > run.progress_percent {
                    run.progress_percent = progress;
                }
            }
        })
    }

    async fn update_results(
        &self,
        run_id: RunId,
        intermediate_outputs: &IntermediateOutputs,
        outputs: &[ImageRef],
    ) -> Result<bool, StoreError> {
        self.finish(run_id, RunStatus::Completed, |run| {
            run.progress_percent = PROGRESS_MAX;
            run.intermediate_outputs = Some(intermediate_outputs.clone());
            run.outputs = outputs.to_vec();
            run.error_message = None;
        })
    }

    async fn update_error(&self, run_id: RunId, message: &str) -> Result<bool, StoreError> {
        self.finish(run_id, RunStatus::Failed, |run| {
            run.error_message = Some(message.to_string());
        })
    }

    async fn get_by_id(&self, run_id: RunId) -> Result<Option<RunRecord>, StoreError> {
        self.with_runs(|runs| runs.by_id.get(&run_id).cloned())
    }

    async fn get_many(&self, run_ids: &[RunId]) -> Result<Vec<RunRecord>, StoreError> {
        self.with_runs(|runs| {
            run_ids
                .iter()
                .filter_map(|id| runs.by_id.get(id).cloned())
                .collect()
        })
    }
}

/// [`PresetCatalog`] over a fixed list of presets.
#[derive(Debug, Clone, Default)]
pub struct StaticPresetCatalog {
    presets: Vec<PresetDetail>,
}

impl StaticPresetCatalog {
    pub fn new(presets: Vec<PresetDetail>) -> Self {
        Self { presets }
    }

    /// Load presets from a JSON array of preset objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Catalog(format!("{}: {e}", path.display())))?;
        let presets: Vec<PresetDetail> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), count = presets.len(), "Loaded preset catalog");
        Ok(Self::new(presets))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[async_trait]
impl PresetCatalog for StaticPresetCatalog {
    async fn get_details_by_ids_and_category(
        &self,
        ids: &[PresetId],
        category: SubjectCategory,
    ) -> Result<Vec<PresetDetail>, StoreError> {
        let matching = self
            .presets
            .iter()
            .filter(|p| p.category == category && ids.contains(&p.preset_id))
            .cloned()
            .collect();
        Ok(order_by_request(ids, matching))
    }
}
