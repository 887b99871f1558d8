use wardrobe_core::error::CoreError;
use wardrobe_core::store::{StorageError, StoreError};
use wardrobe_providers::ProviderError;

/// Error from one attempt of one stage unit.
///
/// The stage executor retries on any variant; none of these escape a
/// fan-out.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The provider answered, but not with something usable.
    #[error("Invalid stage output: {0}")]
    InvalidOutput(String),
}

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request was rejected before any stage ran.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// No branch can produce an output any more.
    #[error("{0}")]
    Fatal(String),

    /// Recording the run outcome failed.
    #[error("Failed to persist run: {0}")]
    Store(#[from] StoreError),
}

/// Errors from a progress tracker backend.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Progress map lock poisoned")]
    Poisoned,
}
