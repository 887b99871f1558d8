//! Behaviour of the submit-then-poll loop against scripted providers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use wardrobe_providers::{
    run_to_completion, JobHandle, JobSpec, NormalizedStatus, PollConfig, Provider, ProviderError,
    ProviderOutput, Submission,
};

/// A provider that replays a fixed sequence of statuses.
///
/// Once the script is exhausted the last status repeats forever.
struct ScriptedProvider {
    initial: NormalizedStatus,
    inline_output: Option<ProviderOutput>,
    script: Mutex<VecDeque<NormalizedStatus>>,
    last: Mutex<NormalizedStatus>,
    status_calls: AtomicUsize,
    result_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(initial: NormalizedStatus, script: Vec<NormalizedStatus>) -> Self {
        Self {
            last: Mutex::new(initial.clone()),
            initial,
            inline_output: None,
            script: Mutex::new(script.into()),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
        }
    }

    fn with_inline_output(mut self, output: ProviderOutput) -> Self {
        self.inline_output = Some(output);
        self
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        Ok(Submission {
            handle: JobHandle { id: "job-1".into(), model: spec.model.clone() },
            status: self.initial.clone(),
            output: self.inline_output.clone(),
        })
    }

    async fn fetch_status(&self, _handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(status) = next {
            *last = status;
        }
        Ok(last.clone())
    }

    async fn fetch_result(&self, _handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderOutput::Urls(vec!["https://cdn.test/out.png".into()]))
    }
}

fn fast_poll(max_wait_ms: u64) -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(5),
        max_wait: Duration::from_millis(max_wait_ms),
    }
}

fn spec() -> JobSpec {
    JobSpec::new("owner/model", serde_json::json!({}))
}

#[tokio::test]
async fn polls_until_succeeded_then_fetches_result() {
    let provider = ScriptedProvider::new(
        NormalizedStatus::Queued,
        vec![NormalizedStatus::Running, NormalizedStatus::Running, NormalizedStatus::Succeeded],
    );

    let output = run_to_completion(&provider, &spec(), &fast_poll(1_000)).await.unwrap();

    assert_eq!(output.first_url(), Some("https://cdn.test/out.png"));
    assert_eq!(provider.status_calls.load(Ordering::SeqCst), 3);
    assert_eq!(provider.result_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn synchronous_success_skips_polling() {
    let provider = ScriptedProvider::new(NormalizedStatus::Succeeded, vec![])
        .with_inline_output(ProviderOutput::Text("woman".into()));

    let output = run_to_completion(&provider, &spec(), &fast_poll(1_000)).await.unwrap();

    assert_eq!(output, ProviderOutput::Text("woman".into()));
    assert_eq!(provider.status_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.result_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_failure_carries_vendor_message() {
    let provider = ScriptedProvider::new(
        NormalizedStatus::Running,
        vec![NormalizedStatus::failed("CUDA out of memory")],
    );

    let err = run_to_completion(&provider, &spec(), &fast_poll(1_000)).await.unwrap_err();

    assert_matches!(
        err,
        ProviderError::ProviderFailure { ref message, .. } if message == "CUDA out of memory"
    );
    assert!(!err.is_transport());
}

#[tokio::test]
async fn never_terminal_job_times_out() {
    let provider = ScriptedProvider::new(NormalizedStatus::Queued, vec![NormalizedStatus::Running]);

    let err = run_to_completion(&provider, &spec(), &fast_poll(40)).await.unwrap_err();

    assert_matches!(err, ProviderError::Timeout { ref job_id, .. } if job_id == "job-1");
    assert!(provider.status_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(provider.result_calls.load(Ordering::SeqCst), 0);
}
