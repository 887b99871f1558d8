//! Collaborator seams consumed by the pipeline.
//!
//! - [`RunStore`]: relational persistence of run records.
//! - [`PresetCatalog`]: preset lookup by id and subject category.
//! - [`ObjectStorage`]: blob upload returning a public URL.
//!
//! All three are object-safe so they can be shared as `Arc<dyn ...>`.

use async_trait::async_trait;

use crate::outputs::IntermediateOutputs;
use crate::preset::{PresetDetail, SubjectCategory};
use crate::run::{ImageRef, NewRun, RunRecord};
use crate::types::{PresetId, RunId};

/// Errors surfaced by a [`RunStore`] or [`PresetCatalog`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database rejected or failed the query.
    #[error("Database error: {0}")]
    Database(String),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The run does not exist.
    #[error("Run {0} not found")]
    RunNotFound(RunId),

    /// The preset catalog source could not be loaded.
    #[error("Preset catalog unavailable: {0}")]
    Catalog(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors surfaced by an [`ObjectStorage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload of '{name}' failed: {message}")]
    Upload { name: String, message: String },

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

/// Persistence of run records.
///
/// Terminal writes ([`update_results`](Self::update_results),
/// [`update_error`](Self::update_error)) only apply to a run that is not
/// already terminal and report whether they did, so a run reaches a
/// terminal state exactly once.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a new run in `pending` with progress 0.
    async fn create_pending(&self, input: &NewRun) -> Result<RunRecord, StoreError>;

    /// Move a `pending` run to `running`. Returns `false` if the run was
    /// not pending.
    async fn mark_running(&self, run_id: RunId) -> Result<bool, StoreError>;

    /// Atomically claim the oldest `pending` run and move it to `running`.
    async fn claim_next_pending(&self) -> Result<Option<RunRecord>, StoreError>;

    /// Raise the stored progress value. Lower values and writes to a
    /// terminal run are ignored.
    async fn write_progress(&self, run_id: RunId, progress: i16) -> Result<(), StoreError>;

    /// Record a successful run: outputs, audit log, status `completed`,
    /// progress 100.
    async fn update_results(
        &self,
        run_id: RunId,
        intermediate_outputs: &IntermediateOutputs,
        outputs: &[ImageRef],
    ) -> Result<bool, StoreError>;

    /// Record a failed run with its error text.
    async fn update_error(&self, run_id: RunId, message: &str) -> Result<bool, StoreError>;

    async fn get_by_id(&self, run_id: RunId) -> Result<Option<RunRecord>, StoreError>;

    /// Fetch several runs at once. Unknown ids are simply absent from the
    /// result.
    async fn get_many(&self, run_ids: &[RunId]) -> Result<Vec<RunRecord>, StoreError>;
}

/// Lookup of preset rows.
#[async_trait]
pub trait PresetCatalog: Send + Sync {
    /// Return the presets among `ids` that belong to `category`.
    ///
    /// Zero matching rows is a valid answer, not an error.
    async fn get_details_by_ids_and_category(
        &self,
        ids: &[PresetId],
        category: SubjectCategory,
    ) -> Result<Vec<PresetDetail>, StoreError>;
}

/// Blob storage for every intermediate and final image.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `name` and return its public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;
}
