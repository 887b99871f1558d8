//! Pending-run dispatcher.
//!
//! Polls the run store every `poll_interval` and launches claimed runs,
//! never holding more than `max_concurrent_runs` at once. Claims go
//! through [`RunStore::claim_next_pending`], which is atomic across
//! processes in the PostgreSQL store (`FOR UPDATE SKIP LOCKED`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use wardrobe_core::store::{RunStore, StoreError};

use crate::config::WorkerConfig;
use crate::launcher::RunLauncher;

pub struct RunDispatcher {
    store: Arc<dyn RunStore>,
    launcher: RunLauncher,
    slots: Arc<Semaphore>,
    poll_interval: Duration,
}

impl RunDispatcher {
    pub fn new(store: Arc<dyn RunStore>, launcher: RunLauncher, config: &WorkerConfig) -> Self {
        Self {
            store,
            launcher,
            slots: Arc::new(Semaphore::new(config.max_concurrent_runs)),
            poll_interval: config.poll_interval,
        }
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// Runs already launched keep going after cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_concurrent_runs = self.slots.available_permits(),
            "Run dispatcher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Run dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.try_dispatch().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// One dispatch cycle: claim and launch runs while slots are free.
    /// Returns how many runs were launched.
    pub async fn try_dispatch(&self) -> Result<usize, StoreError> {
        let mut launched = 0;
        loop {
            let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
                break;
            };
            let Some(run) = self.store.claim_next_pending().await? else {
                break;
            };
            tracing::info!(run_id = run.id, presets = ?run.preset_ids, "Run claimed");
            self.launcher.launch_claimed(run.id, run.inputs(), permit);
            launched += 1;
        }
        Ok(launched)
    }
}
