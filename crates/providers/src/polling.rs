//! Submit-then-poll driver shared by every provider.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::ProviderError;
use crate::job::{JobSpec, NormalizedStatus, ProviderOutput};
use crate::provider::Provider;

/// Default delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default budget for one job to reach a terminal status.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Polling cadence and budget for [`run_to_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Submit a job and poll it until it reaches a terminal status.
///
/// - Succeeded: returns the output (inline from the submission when the
///   vendor answered synchronously, otherwise via `fetch_result`).
/// - Failed: [`ProviderError::ProviderFailure`] with the vendor message.
/// - Still non-terminal once `max_wait` has elapsed since submission:
///   [`ProviderError::Timeout`].
///
/// Transport errors from any call are returned as-is.
pub async fn run_to_completion(
    provider: &dyn Provider,
    spec: &JobSpec,
    poll: &PollConfig,
) -> Result<ProviderOutput, ProviderError> {
    let submission = provider.submit(spec).await?;
    let handle = submission.handle;
    let started = Instant::now();
    let deadline = started + poll.max_wait;

    tracing::debug!(
        provider = provider.name(),
        job_id = %handle.id,
        model = %handle.model,
        status = submission.status.as_str(),
        "Provider job submitted",
    );

    let mut status = submission.status;
    if let (NormalizedStatus::Succeeded, Some(output)) = (&status, submission.output) {
        return Ok(output);
    }

    loop {
        match status {
            NormalizedStatus::Succeeded => {
                tracing::debug!(
                    provider = provider.name(),
                    job_id = %handle.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Provider job succeeded",
                );
                return provider.fetch_result(&handle).await;
            }
            NormalizedStatus::Failed { message } => {
                return Err(ProviderError::ProviderFailure {
                    provider: provider.name(),
                    job_id: handle.id,
                    message,
                });
            }
            NormalizedStatus::Queued | NormalizedStatus::Running => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ProviderError::Timeout {
                provider: provider.name(),
                job_id: handle.id,
                waited: now - started,
            });
        }
        tokio::time::sleep(poll.interval.min(deadline - now)).await;

        status = provider.fetch_status(&handle).await?;
        tracing::trace!(
            provider = provider.name(),
            job_id = %handle.id,
            status = status.as_str(),
            "Polled provider job",
        );
    }
}
