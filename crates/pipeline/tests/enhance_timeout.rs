//! A stuck edit job exhausts its retries without sinking the run.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wardrobe_core::preset::SubjectCategory;
use wardrobe_core::store::RunStore;
use wardrobe_db::InMemoryRunStore;
use wardrobe_pipeline::stages::{EditBackend, EnhanceStage};
use wardrobe_pipeline::{
    FanOut, PipelineDriver, PipelineStages, ProgressTracker, RetryPolicy, RunOutcome,
    StageExecutor,
};
use wardrobe_providers::fetch::ImageFetcher;
use wardrobe_providers::http::build_client;
use wardrobe_providers::vision::VisionClient;
use wardrobe_providers::{
    JobHandle, JobSpec, NormalizedStatus, PollConfig, Provider, ProviderError, ProviderOutput,
    Submission,
};
use wardrobe_storage::MemoryStorage;

use common::*;

/// Vision model that answers synchronously with a fixed description.
struct InstantVision;

#[async_trait]
impl Provider for InstantVision {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        Ok(Submission {
            handle: JobHandle { id: "v-1".into(), model: spec.model.clone() },
            status: NormalizedStatus::Succeeded,
            output: Some(ProviderOutput::Text("sharpen fabric texture".into())),
        })
    }

    async fn fetch_status(&self, _handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        Ok(NormalizedStatus::Succeeded)
    }

    async fn fetch_result(&self, _handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Text("sharpen fabric texture".into()))
    }
}

/// Edit API whose jobs for the second generated image never finish.
#[derive(Default)]
struct StuckEditor {
    submissions: AtomicUsize,
}

fn is_stuck(spec: &JobSpec) -> bool {
    spec.input["images"][0]
        .as_str()
        .is_some_and(|url| url.contains("gen-2"))
}

#[async_trait]
impl Provider for StuckEditor {
    fn name(&self) -> &'static str {
        "editor"
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let handle = JobHandle { id: format!("e-{}", spec.input["images"][0]), model: spec.model.clone() };
        if is_stuck(spec) {
            return Ok(Submission { handle, status: NormalizedStatus::Running, output: None });
        }
        Ok(Submission {
            handle,
            status: NormalizedStatus::Succeeded,
            output: Some(ProviderOutput::Image {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png".into(),
            }),
        })
    }

    async fn fetch_status(&self, _handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        Ok(NormalizedStatus::Running)
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        Err(ProviderError::malformed("editor", format!("no result for {}", handle.id)))
    }
}

#[tokio::test]
async fn stuck_enhancement_drops_only_its_branch() {
    let poll = PollConfig {
        interval: Duration::from_millis(5),
        max_wait: Duration::from_millis(30),
    };
    let fetcher = ImageFetcher::new(build_client(Duration::from_secs(5)).unwrap());
    let storage = Arc::new(MemoryStorage::default());
    let editor = Arc::new(StuckEditor::default());

    let enhance = EnhanceStage::new(
        VisionClient::new(Arc::new(InstantVision), "vision-model", poll),
        editor.clone(),
        EditBackend::Wavespeed,
        "edit-model",
        poll,
        fetcher,
        storage.clone(),
    );

    let catalog = vec![
        preset(1, SubjectCategory::Woman),
        preset(2, SubjectCategory::Woman),
        preset(3, SubjectCategory::Woman),
    ];
    let generate = Arc::new(FakeImageStage::new("gen", []));
    let stages = PipelineStages {
        analyze: StageExecutor::new(
            Arc::new(FakeAnalyze::new(SubjectCategory::Woman, catalog)),
            RetryPolicy::immediate(3),
        ),
        generate: StageExecutor::new(Arc::new(FakeGenerate(generate)), RetryPolicy::immediate(3)),
        enhance: StageExecutor::new(Arc::new(enhance), RetryPolicy::immediate(3)),
    };

    let store = Arc::new(InMemoryRunStore::new());
    let tracker = Arc::new(RecordingTracker::default());
    let driver = PipelineDriver::new(stages, FanOut::default(), store.clone(), tracker.clone());

    let inputs = new_run(vec![1, 2, 3]);
    let run = store.create_pending(&inputs).await.unwrap();
    tracker.create(run.id).await.unwrap();

    let outcome = driver.run(run.id, &inputs).await;
    assert_eq!(outcome, RunOutcome::Completed { outputs: 2 });

    // One submission per attempt for the stuck branch, one each for the others.
    assert_eq!(editor.submissions.load(Ordering::SeqCst), 5);
    assert_eq!(storage.len(), 2);

    let record = store.get_by_id(run.id).await.unwrap().unwrap();
    for output in &record.outputs {
        assert!(storage.get(&output.url).is_some(), "{} not stored", output.url);
    }
    let step_enhance = record.intermediate_outputs.unwrap().step_enhance;
    let stuck = step_enhance.iter().find(|r| r.preset_id == 2).unwrap();
    assert!(stuck.output_url.is_none());
    let reason = stuck.error.as_deref().unwrap();
    assert!(reason.contains("failed after 3 attempts"), "{reason}");

    let trace = tracker.trace();
    assert!(trace.windows(2).all(|w| w[0] <= w[1]), "{trace:?}");
    assert_eq!(trace.last(), Some(&100));
}
