use std::time::Duration;

/// Dispatcher configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between attempts to claim pending runs.
    pub poll_interval: Duration,
    /// Runs executing at once in this process.
    pub max_concurrent_runs: usize,
    /// How long shutdown waits for in-flight runs to finish.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_concurrent_runs: 4,
            shutdown_timeout: Duration::from_secs(600),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `DISPATCH_POLL_INTERVAL_MS`  | `1000`  |
    /// | `MAX_CONCURRENT_RUNS`        | `4`     |
    /// | `WORKER_SHUTDOWN_TIMEOUT_SECS` | `600` |
    pub fn from_env() -> Self {
        let poll_interval_ms: u64 = std::env::var("DISPATCH_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("DISPATCH_POLL_INTERVAL_MS must be a valid u64");

        let max_concurrent_runs: usize = std::env::var("MAX_CONCURRENT_RUNS")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("MAX_CONCURRENT_RUNS must be a valid usize");

        let shutdown_timeout_secs: u64 = std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("WORKER_SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            max_concurrent_runs: max_concurrent_runs.max(1),
            shutdown_timeout: Duration::from_secs(shutdown_timeout_secs),
        }
    }
}
