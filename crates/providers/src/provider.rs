use async_trait::async_trait;

use crate::error::ProviderError;
use crate::job::{JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission};

/// One external inference vendor.
///
/// Implementations hold no per-job state; every call is a standalone
/// HTTP exchange. Status and output are normalized before they leave
/// the implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short vendor name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Create a job.
    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError>;

    /// Fetch the current status of a job.
    async fn fetch_status(&self, handle: &JobHandle) -> Result<NormalizedStatus, ProviderError>;

    /// Fetch the output of a succeeded job.
    async fn fetch_result(&self, handle: &JobHandle) -> Result<ProviderOutput, ProviderError>;
}
