//! One conceptual transformation and its retrying executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StageError;

/// One transformation applied to one unit of work.
///
/// `attempt` performs a single try and must not touch shared run state;
/// retries are the executor's job.
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Short stage name for logs and failure reasons.
    fn name(&self) -> &'static str;

    async fn attempt(&self, input: &Self::Input) -> Result<Self::Output, StageError>;
}

/// Why a unit produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub reason: String,
    /// Attempts made before giving up. Zero if the unit never ran to an
    /// answer (panic or aborted task).
    pub attempts: u32,
}

impl BranchFailure {
    pub fn new(reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            reason: reason.into(),
            attempts,
        }
    }
}

impl std::fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of one unit: its output, or why there is none.
pub type BranchOutcome<T> = Result<T, BranchFailure>;

/// Bounded retry with exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Retry `max_attempts` times with no delay. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// The delay after `current`, clamped to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

/// Runs a [`Stage`] for one unit with retries, never raising.
pub struct StageExecutor<I, O> {
    stage: Arc<dyn Stage<Input = I, Output = O>>,
    policy: RetryPolicy,
}

impl<I, O> Clone for StageExecutor<I, O> {
    fn clone(&self) -> Self {
        Self {
            stage: Arc::clone(&self.stage),
            policy: self.policy,
        }
    }
}

impl<I, O> StageExecutor<I, O>
where
    I: Send + Sync,
    O: Send,
{
    pub fn new(stage: Arc<dyn Stage<Input = I, Output = O>>, policy: RetryPolicy) -> Self {
        Self { stage, policy }
    }

    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }

    /// Attempt the unit up to `max_attempts` times.
    ///
    /// Every error (transport, provider failure, timeout, malformed or
    /// empty output, upload failure) counts as a failed attempt. After the
    /// last one the unit resolves to a [`BranchFailure`] carrying the last
    /// error.
    pub async fn execute_unit(&self, input: &I) -> BranchOutcome<O> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.stage.attempt(input).await {
                Ok(output) => {
                    if attempt > 1 {
                        tracing::info!(stage = self.stage.name(), attempt, "Stage unit succeeded after retry");
                    }
                    return Ok(output);
                }
                Err(e) => {
                    tracing::warn!(
                        stage = self.stage.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Stage unit attempt failed",
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts && !delay.is_zero() {
                tokio::time::sleep(delay).await;
                delay = self.policy.next_delay(delay);
            }
        }

        Err(BranchFailure::new(
            format!(
                "{} failed after {max_attempts} attempts: {last_error}",
                self.stage.name()
            ),
            max_attempts,
        ))
    }
}
