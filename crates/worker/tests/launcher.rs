//! Launcher and dispatcher behaviour over in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use wardrobe_core::outputs::AnalysisResult;
use wardrobe_core::preset::{PresetDetail, SubjectCategory};
use wardrobe_core::run::{NewRun, RunStatus};
use wardrobe_core::store::RunStore;
use wardrobe_db::InMemoryRunStore;
use wardrobe_pipeline::stages::{AnalyzeInput, EnhanceInput, GenerateInput};
use wardrobe_pipeline::{
    FanOut, InMemoryProgressTracker, PipelineDriver, PipelineStages, ProgressTracker, RetryPolicy,
    RunOutcome, Stage, StageError, StageExecutor,
};
use wardrobe_worker::{RunDispatcher, RunLauncher, WorkerConfig};

/// Analyze stage that can panic or block until released.
#[derive(Default)]
struct Analyze {
    panic: bool,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Stage for Analyze {
    type Input = AnalyzeInput;
    type Output = AnalysisResult;

    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn attempt(&self, input: &AnalyzeInput) -> Result<AnalysisResult, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("vision client exploded");
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        Ok(AnalysisResult {
            category: SubjectCategory::Man,
            clothing_type: "jacket".into(),
            garment_description: serde_json::json!({"clothing_type": "jacket"}),
            preset_details: input
                .preset_ids
                .iter()
                .map(|id| PresetDetail {
                    preset_id: *id,
                    name: format!("Preset {id}"),
                    category: SubjectCategory::Man,
                    ref_image_url: format!("https://cdn.test/ref-{id}.png"),
                    description: "street".into(),
                    pose: None,
                    setting: None,
                    lighting: None,
                })
                .collect(),
        })
    }
}

struct Generate;

#[async_trait]
impl Stage for Generate {
    type Input = GenerateInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "generate"
    }

    async fn attempt(&self, input: &GenerateInput) -> Result<String, StageError> {
        Ok(format!("https://cdn.test/gen-{}.png", input.preset.preset_id))
    }
}

struct Enhance;

#[async_trait]
impl Stage for Enhance {
    type Input = EnhanceInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "enhance"
    }

    async fn attempt(&self, input: &EnhanceInput) -> Result<String, StageError> {
        Ok(format!("https://cdn.test/enh-{}.png", input.preset_id))
    }
}

struct Fixture {
    store: Arc<InMemoryRunStore>,
    tracker: Arc<InMemoryProgressTracker>,
    launcher: RunLauncher,
}

fn fixture(analyze: Arc<Analyze>) -> Fixture {
    let store = Arc::new(InMemoryRunStore::new());
    let tracker = Arc::new(InMemoryProgressTracker::new());
    let stages = PipelineStages {
        analyze: StageExecutor::new(analyze, RetryPolicy::immediate(1)),
        generate: StageExecutor::new(Arc::new(Generate), RetryPolicy::immediate(1)),
        enhance: StageExecutor::new(Arc::new(Enhance), RetryPolicy::immediate(1)),
    };
    let driver = PipelineDriver::new(stages, FanOut::default(), store.clone(), tracker.clone());
    Fixture {
        store,
        tracker,
        launcher: RunLauncher::new(Arc::new(driver)),
    }
}

fn inputs() -> NewRun {
    NewRun {
        person_image_url: "https://cdn.test/person.png".into(),
        garment_image_url: "https://cdn.test/garment.png".into(),
        preset_ids: vec![1, 2],
    }
}

async fn create(f: &Fixture) -> i64 {
    let run = f.store.create_pending(&inputs()).await.unwrap();
    f.tracker.create(run.id).await.unwrap();
    run.id
}

#[tokio::test]
async fn launched_run_completes_in_background() {
    let f = fixture(Arc::new(Analyze::default()));
    let run_id = create(&f).await;

    let outcome = f.launcher.launch(run_id, inputs()).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed { outputs: 2 });

    let run = f.store.get_by_id(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.started_at.is_some() && run.completed_at.is_some());
    assert!(f.tracker.get(run_id).await.unwrap().unwrap().is_complete);
}

#[tokio::test]
async fn panicking_run_is_recorded_as_failed() {
    let f = fixture(Arc::new(Analyze { panic: true, ..Default::default() }));
    let run_id = create(&f).await;

    let outcome = f.launcher.launch(run_id, inputs()).await.unwrap();
    assert_matches!(outcome, RunOutcome::Failed { ref error } if error.contains("vision client exploded"));

    let run = f.store.get_by_id(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.unwrap().starts_with("Run task panicked"));

    let progress = f.tracker.get(run_id).await.unwrap().unwrap();
    assert!(progress.is_complete);
    assert!(progress.error.is_some());
}

#[tokio::test]
async fn run_claimed_by_the_dispatcher_is_not_launched_again() {
    let analyze = Arc::new(Analyze::default());
    let f = fixture(analyze.clone());
    let run_id = create(&f).await;
    let dispatcher =
        RunDispatcher::new(f.store.clone(), f.launcher.clone(), &WorkerConfig::default());

    assert_eq!(dispatcher.try_dispatch().await.unwrap(), 1);
    let outcome = f.launcher.launch(run_id, inputs()).await.unwrap();
    assert_eq!(outcome, RunOutcome::NotClaimed);

    assert!(f.launcher.shutdown(Duration::from_secs(5)).await);
    assert_eq!(analyze.calls.load(Ordering::SeqCst), 1);
    let run = f.store.get_by_id(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.error_message.is_none());
}

#[tokio::test]
async fn dispatcher_respects_concurrency_limit() {
    let gate = Arc::new(Notify::new());
    let analyze = Arc::new(Analyze { gate: Some(gate.clone()), ..Default::default() });
    let f = fixture(analyze.clone());
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(create(&f).await);
    }

    let config = WorkerConfig {
        poll_interval: Duration::from_millis(5),
        max_concurrent_runs: 2,
        ..WorkerConfig::default()
    };
    let dispatcher = RunDispatcher::new(f.store.clone(), f.launcher.clone(), &config);

    assert_eq!(dispatcher.try_dispatch().await.unwrap(), 2);
    assert_eq!(dispatcher.try_dispatch().await.unwrap(), 0);
    let third = f.store.get_by_id(ids[2]).await.unwrap().unwrap();
    assert_eq!(third.status, RunStatus::Pending);

    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(async move { dispatcher.run(loop_cancel).await });

    // Release blocked analyses until every run has finished.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        gate.notify_waiters();
        let runs = f.store.get_many(&ids).await.unwrap();
        if runs.iter().all(|r| r.status.is_terminal()) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "runs did not finish");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    cancel.cancel();
    handle.await.unwrap();
    assert!(f.launcher.shutdown(Duration::from_secs(1)).await);
    assert!(analyze.peak.load(Ordering::SeqCst) <= 2);
    for run in f.store.get_many(&ids).await.unwrap() {
        assert_eq!(run.status, RunStatus::Completed);
    }
}
