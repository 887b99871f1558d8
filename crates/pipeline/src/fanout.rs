//! Concurrent dispatch of one stage's units over a bounded pool.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::stage::{BranchFailure, BranchOutcome, StageExecutor};

/// Default cap on units in flight per stage.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Bounded fan-out coordinator.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    pub max_concurrency: usize,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl FanOut {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Run every unit through `executor` with at most
    /// `min(units, max_concurrency)` in flight, and wait for all of them.
    ///
    /// The result holds exactly one outcome per unit, returned in input
    /// order and paired with the unit's key. A panicking unit is recorded
    /// as that unit's failure. `on_settled(settled, total)` runs after
    /// each unit settles, one call at a time.
    pub async fn run_concurrently<K, I, O, F, Fut>(
        &self,
        units: Vec<(K, I)>,
        executor: &StageExecutor<I, O>,
        mut on_settled: F,
    ) -> Vec<(K, BranchOutcome<O>)>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
        F: FnMut(usize, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let total = units.len();
        if total == 0 {
            return Vec::new();
        }

        let stage = executor.stage_name();
        let permits = Arc::new(Semaphore::new(self.max_concurrency.clamp(1, total)));
        let mut keys = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (index, (key, input)) in units.into_iter().enumerate() {
            keys.push(key);
            let executor = executor.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err(BranchFailure::new("worker pool closed", 0))),
                };
                let outcome = AssertUnwindSafe(executor.execute_unit(&input))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(stage, unit = index, error = %message, "Stage unit panicked");
                        Err(BranchFailure::new(format!("{stage} panicked: {message}"), 0))
                    });
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<BranchOutcome<O>>> = (0..total).map(|_| None).collect();
        let mut settled = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!(stage, error = %e, "Stage unit task aborted"),
            }
            settled += 1;
            on_settled(settled, total).await;
        }

        keys.into_iter()
            .zip(outcomes)
            .map(|(key, outcome)| {
                let outcome = outcome
                    .unwrap_or_else(|| Err(BranchFailure::new(format!("{stage} task aborted"), 0)));
                (key, outcome)
            })
            .collect()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::StageError;
    use crate::stage::{RetryPolicy, Stage};

    /// Sleeps `input` ms, tracks peak concurrency, panics on 13, fails on
    /// odd inputs.
    #[derive(Default)]
    struct Probe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Stage for Probe {
        type Input = u64;
        type Output = u64;

        fn name(&self) -> &'static str {
            "probe"
        }

        async fn attempt(&self, input: &u64) -> Result<u64, StageError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(*input)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if *input == 13 {
                panic!("probe exploded");
            }
            if input % 2 == 1 {
                return Err(StageError::InvalidOutput("odd".into()));
            }
            Ok(input * 10)
        }
    }

    #[tokio::test]
    async fn every_unit_gets_exactly_its_own_outcome() {
        let executor = StageExecutor::new(Arc::new(Probe::default()), RetryPolicy::immediate(1));
        let units = vec![("a", 30), ("b", 5), ("c", 13), ("d", 20), ("e", 1)];

        let results = FanOut::new(10).run_concurrently(units, &executor, |_, _| async {}).await;

        let keys: Vec<_> = results.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(results[0].1, Ok(300));
        assert!(results[1].1.is_err());
        assert!(results[2].1.as_ref().unwrap_err().reason.contains("probe exploded"));
        assert_eq!(results[3].1, Ok(200));
        assert!(results[4].1.is_err());
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_cap() {
        let probe = Arc::new(Probe::default());
        let executor = StageExecutor::new(probe.clone(), RetryPolicy::immediate(1));
        let units: Vec<_> = (0..12).map(|i| (i, 10)).collect();

        let results = FanOut::new(3).run_concurrently(units, &executor, |_, _| async {}).await;

        assert_eq!(results.len(), 12);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn reports_each_settled_unit() {
        let executor = StageExecutor::new(Arc::new(Probe::default()), RetryPolicy::immediate(1));
        let units: Vec<_> = (0..4).map(|i| (i, 2)).collect();
        let mut seen = Vec::new();

        FanOut::default()
            .run_concurrently(units, &executor, |settled, total| {
                seen.push((settled, total));
                async {}
            })
            .await;

        assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }
}
