//! One spawned task per run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use wardrobe_core::run::NewRun;
use wardrobe_core::types::RunId;
use wardrobe_pipeline::{PipelineDriver, RunOutcome};

/// Spawns run tasks and keeps track of them for shutdown.
///
/// Runs are never cancelled: a launched run executes until the driver
/// records its terminal state.
#[derive(Clone)]
pub struct RunLauncher {
    driver: Arc<PipelineDriver>,
    tasks: TaskTracker,
}

impl RunLauncher {
    pub fn new(driver: Arc<PipelineDriver>) -> Self {
        Self {
            driver,
            tasks: TaskTracker::new(),
        }
    }

    pub fn driver(&self) -> &Arc<PipelineDriver> {
        &self.driver
    }

    /// Runs currently executing.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Claim `run_id` and execute it in the background, returning
    /// immediately. A run that is no longer pending is skipped.
    pub fn launch(&self, run_id: RunId, inputs: NewRun) -> JoinHandle<RunOutcome> {
        self.spawn(run_id, inputs, Claim::Pending, ())
    }

    /// Execute a run already claimed by the caller, keeping `guard` alive
    /// until it has finished.
    pub fn launch_claimed<G>(&self, run_id: RunId, inputs: NewRun, guard: G) -> JoinHandle<RunOutcome>
    where
        G: Send + 'static,
    {
        self.spawn(run_id, inputs, Claim::Held, guard)
    }

    fn spawn<G>(&self, run_id: RunId, inputs: NewRun, claim: Claim, guard: G) -> JoinHandle<RunOutcome>
    where
        G: Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        let span = tracing::info_span!("run", run_id);
        self.tasks.spawn(
            async move {
                let _guard = guard;
                execute_guarded(&driver, run_id, &inputs, claim).await
            }
            .instrument(span),
        )
    }

    /// Stop accepting new runs and wait up to `timeout` for the in-flight
    /// ones. Returns `false` if some were still running at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let remaining = self.tasks.len();
        if remaining > 0 {
            tracing::info!(remaining, "Waiting for in-flight runs");
        }
        tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok()
    }
}

#[derive(Debug, Clone, Copy)]
enum Claim {
    /// The driver must win the pending -> running transition itself.
    Pending,
    /// The caller already moved the run to `running`.
    Held,
}

/// Run the driver, converting a panic into a recorded failure.
async fn execute_guarded(
    driver: &PipelineDriver,
    run_id: RunId,
    inputs: &NewRun,
    claim: Claim,
) -> RunOutcome {
    let execution = async {
        match claim {
            Claim::Pending => driver.run(run_id, inputs).await,
            Claim::Held => driver.run_claimed(run_id, inputs).await,
        }
    };
    match AssertUnwindSafe(execution).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let error = format!("Run task panicked: {}", panic_message(panic.as_ref()));
            tracing::error!(run_id, error = %error, "Run task panicked");
            driver.record_failure(run_id, &error).await;
            RunOutcome::Failed { error }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
