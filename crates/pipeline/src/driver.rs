//! The pipeline driver: sequences stages, reports progress and records
//! the run's single terminal outcome.

use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;
use std::time::Instant;

use wardrobe_core::outputs::{AnalysisResult, BranchRecord, IntermediateOutputs};
use wardrobe_core::preset::PresetDetail;
use wardrobe_core::progress::{ANALYZE_SLICE, ENHANCE_SLICE, GENERATE_SLICE};
use wardrobe_core::run::{ImageRef, NewRun};
use wardrobe_core::store::{ObjectStorage, PresetCatalog, RunStore};
use wardrobe_core::types::RunId;
use wardrobe_core::validation::validate_preset_ids;
use wardrobe_providers::fal::FalClient;
use wardrobe_providers::fetch::ImageFetcher;
use wardrobe_providers::gemini::GeminiClient;
use wardrobe_providers::http::build_client;
use wardrobe_providers::replicate::ReplicateClient;
use wardrobe_providers::vision::VisionClient;
use wardrobe_providers::wavespeed::WavespeedClient;
use wardrobe_providers::{Provider, ProviderError};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fanout::FanOut;
use crate::progress::ProgressTracker;
use crate::stage::{BranchOutcome, StageExecutor};
use crate::stages::{
    AnalyzeInput, AnalyzeStage, EditBackend, EnhanceInput, EnhanceStage, GenerateInput,
    GenerateStage,
};

pub const NO_VALID_PRESETS: &str = "No valid presets found for the given IDs and category";
pub const NO_IMAGES_GENERATED: &str = "No images were successfully generated";
pub const NO_IMAGES_ENHANCED: &str = "No images were successfully enhanced";

/// The three stage executors a driver sequences.
#[derive(Clone)]
pub struct PipelineStages {
    pub analyze: StageExecutor<AnalyzeInput, AnalysisResult>,
    pub generate: StageExecutor<GenerateInput, String>,
    pub enhance: StageExecutor<EnhanceInput, String>,
}

impl PipelineStages {
    /// Wire the real provider-backed stages.
    pub fn from_config(
        config: &PipelineConfig,
        catalog: Arc<dyn PresetCatalog>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Result<Self, ProviderError> {
        let api_http =
            build_client(config.http_timeout).map_err(|e| ProviderError::transport("http", e))?;
        let download_http = build_client(config.image_download_timeout)
            .map_err(|e| ProviderError::transport("http", e))?;
        let fetcher = ImageFetcher::new(download_http);

        let replicate: Arc<dyn Provider> = Arc::new(ReplicateClient::new(
            api_http.clone(),
            &config.replicate_base_url,
            &config.replicate_api_token,
        ));
        let vision = VisionClient::new(replicate, &config.vision_model, config.poll);

        let gemini: Arc<dyn Provider> = Arc::new(GeminiClient::new(
            api_http.clone(),
            &config.gemini_base_url,
            &config.gemini_api_key,
        ));
        let editor: Arc<dyn Provider> = match config.enhance_backend {
            EditBackend::Wavespeed => Arc::new(WavespeedClient::new(
                api_http,
                &config.wavespeed_base_url,
                &config.wavespeed_api_key,
            )),
            EditBackend::Fal => Arc::new(FalClient::new(
                api_http,
                &config.fal_base_url,
                &config.fal_api_key,
            )),
        };

        let analyze = AnalyzeStage::new(vision.clone(), catalog);
        let generate = GenerateStage::new(
            gemini,
            &config.generate_model,
            &config.generate_aspect_ratio,
            &config.generate_image_size,
            config.poll,
            fetcher.clone(),
            Arc::clone(&storage),
        );
        let enhance = EnhanceStage::new(
            vision,
            editor,
            config.enhance_backend,
            &config.enhance_model,
            config.poll,
            fetcher,
            storage,
        );

        Ok(Self {
            analyze: StageExecutor::new(Arc::new(analyze), config.retry),
            generate: StageExecutor::new(Arc::new(generate), config.retry),
            enhance: StageExecutor::new(Arc::new(enhance), config.retry),
        })
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub analysis: AnalysisResult,
    pub intermediate_outputs: IntermediateOutputs,
    pub outputs: Vec<ImageRef>,
}

/// Terminal outcome of [`PipelineDriver::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { outputs: usize },
    Failed { error: String },
    /// The run was not pending, so another executor owns it.
    NotClaimed,
}

/// Forwards monotonically increasing progress values to the tracker.
///
/// Progress is advisory: tracker errors are logged, never raised.
struct ProgressReporter<'a> {
    run_id: RunId,
    tracker: &'a dyn ProgressTracker,
    last: AtomicI16,
}

impl<'a> ProgressReporter<'a> {
    fn new(run_id: RunId, tracker: &'a dyn ProgressTracker) -> Self {
        Self {
            run_id,
            tracker,
            last: AtomicI16::new(-1),
        }
    }

    async fn report(&self, progress: i16) {
        if self.last.fetch_max(progress, Ordering::SeqCst) >= progress {
            return;
        }
        tracing::debug!(run_id = self.run_id, progress, "Progress");
        if let Err(e) = self.tracker.update(self.run_id, progress as i32).await {
            tracing::warn!(run_id = self.run_id, progress, error = %e, "Failed to update progress");
        }
    }
}

/// Runs the analyze, generate and enhance stages for one run.
pub struct PipelineDriver {
    stages: PipelineStages,
    fan_out: FanOut,
    store: Arc<dyn RunStore>,
    tracker: Arc<dyn ProgressTracker>,
}

impl PipelineDriver {
    pub fn new(
        stages: PipelineStages,
        fan_out: FanOut,
        store: Arc<dyn RunStore>,
        tracker: Arc<dyn ProgressTracker>,
    ) -> Self {
        Self {
            stages,
            fan_out,
            store,
            tracker,
        }
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<dyn ProgressTracker> {
        &self.tracker
    }

    /// Claim a pending run and execute it end to end.
    ///
    /// A run that is no longer pending belongs to whoever moved it out of
    /// `pending`; it is left untouched and [`RunOutcome::NotClaimed`] is
    /// returned. A claim that fails at the store leaves the run pending
    /// for a later dispatch.
    pub async fn run(&self, run_id: RunId, inputs: &NewRun) -> RunOutcome {
        match self.store.mark_running(run_id).await {
            Ok(true) => self.run_claimed(run_id, inputs).await,
            Ok(false) => {
                tracing::info!(run_id, "Run is not pending, skipping");
                RunOutcome::NotClaimed
            }
            Err(e) => {
                tracing::error!(run_id, error = %e, "Failed to claim run");
                RunOutcome::NotClaimed
            }
        }
    }

    /// Execute a run the caller already moved to `running` and record its
    /// terminal state.
    ///
    /// Never returns an error: every failure is recorded on the run
    /// record and in the progress tracker, and reported in the outcome.
    pub async fn run_claimed(&self, run_id: RunId, inputs: &NewRun) -> RunOutcome {
        tracing::info!(run_id, "Run started");
        let started = Instant::now();
        let result = match self.execute(run_id, inputs).await {
            Ok(output) => self.persist(run_id, output).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outputs) => {
                tracing::info!(
                    run_id,
                    outputs,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run completed",
                );
                RunOutcome::Completed { outputs }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(
                    run_id,
                    error = %error,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run failed",
                );
                self.record_failure(run_id, &error).await;
                RunOutcome::Failed { error }
            }
        }
    }

    /// Sequence the stages and report progress, without recording the
    /// terminal state.
    pub async fn execute(
        &self,
        run_id: RunId,
        inputs: &NewRun,
    ) -> Result<PipelineOutput, PipelineError> {
        validate_preset_ids(&inputs.preset_ids)?;

        let reporter = ProgressReporter::new(run_id, self.tracker.as_ref());
        let mut intermediate = IntermediateOutputs::default();

        // Analyze
        reporter.report(ANALYZE_SLICE.floor).await;
        let analysis = self
            .stages
            .analyze
            .execute_unit(&AnalyzeInput {
                person_image_url: inputs.person_image_url.clone(),
                garment_image_url: inputs.garment_image_url.clone(),
                preset_ids: inputs.preset_ids.clone(),
            })
            .await
            .map_err(|failure| PipelineError::Fatal(format!("Analysis failed: {failure}")))?;
        intermediate.step_analyze = Some(analysis.clone());
        if analysis.preset_details.is_empty() {
            return Err(PipelineError::Fatal(NO_VALID_PRESETS.to_string()));
        }
        reporter.report(ANALYZE_SLICE.ceiling).await;

        // Generate
        let units: Vec<_> = analysis
            .preset_details
            .iter()
            .map(|preset| {
                let input = GenerateInput {
                    person_image_url: inputs.person_image_url.clone(),
                    garment_image_url: inputs.garment_image_url.clone(),
                    preset: preset.clone(),
                    garment_description: analysis.garment_description.clone(),
                };
                (preset.clone(), input)
            })
            .collect();
        let generated = self
            .fan_out
            .run_concurrently(units, &self.stages.generate, |settled, total| {
                reporter.report(GENERATE_SLICE.at(settled, total))
            })
            .await;
        let (step_generate, survivors) = settle_branches(run_id, "generate", generated);
        intermediate.step_generate = step_generate;
        reporter.report(GENERATE_SLICE.ceiling).await;
        if survivors.is_empty() {
            return Err(PipelineError::Fatal(NO_IMAGES_GENERATED.to_string()));
        }

        // Enhance
        let units: Vec<_> = survivors
            .into_iter()
            .map(|(preset, image_url)| {
                let input = EnhanceInput {
                    preset_id: preset.preset_id,
                    image_url,
                    clothing_type: analysis.clothing_type.clone(),
                };
                (preset, input)
            })
            .collect();
        let enhanced = self
            .fan_out
            .run_concurrently(units, &self.stages.enhance, |settled, total| {
                reporter.report(ENHANCE_SLICE.at(settled, total))
            })
            .await;
        let (step_enhance, finished) = settle_branches(run_id, "enhance", enhanced);
        intermediate.step_enhance = step_enhance;
        if finished.is_empty() {
            return Err(PipelineError::Fatal(NO_IMAGES_ENHANCED.to_string()));
        }
        reporter.report(ENHANCE_SLICE.ceiling).await;

        let outputs = finished
            .into_iter()
            .map(|(_, url)| ImageRef::new(url))
            .collect();

        Ok(PipelineOutput {
            analysis,
            intermediate_outputs: intermediate,
            outputs,
        })
    }

    async fn persist(&self, run_id: RunId, output: PipelineOutput) -> Result<usize, PipelineError> {
        let applied = self
            .store
            .update_results(run_id, &output.intermediate_outputs, &output.outputs)
            .await?;
        if !applied {
            return Err(PipelineError::Fatal(format!(
                "Run {run_id} was already finalized"
            )));
        }
        if let Err(e) = self.tracker.mark_complete(run_id).await {
            tracing::warn!(run_id, error = %e, "Failed to mark progress complete");
        }
        Ok(output.outputs.len())
    }

    /// Record a failed run in the store and the tracker.
    ///
    /// The two writes are independent: each is attempted even if the
    /// other fails.
    pub async fn record_failure(&self, run_id: RunId, message: &str) {
        if let Err(e) = self.store.update_error(run_id, message).await {
            tracing::error!(run_id, error = %e, "Failed to record run failure in store");
        }
        if let Err(e) = self.tracker.mark_error(run_id, message).await {
            tracing::error!(run_id, error = %e, "Failed to record run failure in progress tracker");
        }
    }
}

/// Split a stage's outcomes into audit records and surviving branches.
fn settle_branches(
    run_id: RunId,
    stage: &'static str,
    outcomes: Vec<(PresetDetail, BranchOutcome<String>)>,
) -> (Vec<BranchRecord>, Vec<(PresetDetail, String)>) {
    let mut records = Vec::with_capacity(outcomes.len());
    let mut survivors = Vec::new();
    for (preset, outcome) in outcomes {
        match outcome {
            Ok(url) => {
                records.push(BranchRecord::succeeded(&preset, url.clone()));
                survivors.push((preset, url));
            }
            Err(failure) => {
                tracing::warn!(
                    run_id,
                    stage,
                    preset_id = preset.preset_id,
                    attempts = failure.attempts,
                    reason = %failure.reason,
                    "Branch dropped",
                );
                records.push(BranchRecord::failed(&preset, failure.reason));
            }
        }
    }
    (records, survivors)
}
