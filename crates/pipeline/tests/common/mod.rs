//! Fakes shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wardrobe_core::outputs::AnalysisResult;
use wardrobe_core::preset::{PresetDetail, SubjectCategory};
use wardrobe_core::progress::ProgressRecord;
use wardrobe_core::run::NewRun;
use wardrobe_core::types::{PresetId, RunId};
use wardrobe_pipeline::stages::{AnalyzeInput, EnhanceInput, GenerateInput};
use wardrobe_pipeline::{InMemoryProgressTracker, ProgressError, ProgressTracker, Stage, StageError};

pub fn preset(id: PresetId, category: SubjectCategory) -> PresetDetail {
    PresetDetail {
        preset_id: id,
        name: format!("Preset {id}"),
        category,
        ref_image_url: format!("https://cdn.test/ref-{id}.png"),
        description: format!("scene {id}"),
        pose: Some("standing".into()),
        setting: Some("studio".into()),
        lighting: Some("softbox".into()),
    }
}

pub fn new_run(preset_ids: Vec<PresetId>) -> NewRun {
    NewRun {
        person_image_url: "https://cdn.test/person.png".into(),
        garment_image_url: "https://cdn.test/garment.png".into(),
        preset_ids,
    }
}

/// Analyze stage that "detects" a fixed category and looks presets up in
/// a fixed catalog.
pub struct FakeAnalyze {
    pub category: SubjectCategory,
    pub catalog: Vec<PresetDetail>,
    pub calls: AtomicUsize,
}

impl FakeAnalyze {
    pub fn new(category: SubjectCategory, catalog: Vec<PresetDetail>) -> Self {
        Self { category, catalog, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Stage for FakeAnalyze {
    type Input = AnalyzeInput;
    type Output = AnalysisResult;

    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn attempt(&self, input: &AnalyzeInput) -> Result<AnalysisResult, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let preset_details = input
            .preset_ids
            .iter()
            .filter_map(|id| {
                self.catalog
                    .iter()
                    .find(|p| p.preset_id == *id && p.category == self.category)
                    .cloned()
            })
            .collect();
        Ok(AnalysisResult {
            category: self.category,
            clothing_type: "dress".into(),
            garment_description: serde_json::json!({"clothing_type": "dress", "color": "red"}),
            preset_details,
        })
    }
}

/// Image stage that fails every attempt for the listed presets and counts
/// calls per preset.
#[derive(Default)]
pub struct FakeImageStage {
    pub label: &'static str,
    pub failing: HashSet<PresetId>,
    pub calls: Mutex<HashMap<PresetId, usize>>,
}

impl FakeImageStage {
    pub fn new(label: &'static str, failing: impl IntoIterator<Item = PresetId>) -> Self {
        Self {
            label,
            failing: failing.into_iter().collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls_for(&self, id: PresetId) -> usize {
        self.calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn produce(&self, id: PresetId) -> Result<String, StageError> {
        *self.calls.lock().unwrap().entry(id).or_default() += 1;
        if self.failing.contains(&id) {
            Err(StageError::InvalidOutput("response has no image part".into()))
        } else {
            Ok(format!("https://cdn.test/{}-{id}.png", self.label))
        }
    }
}

pub struct FakeGenerate(pub Arc<FakeImageStage>);

#[async_trait]
impl Stage for FakeGenerate {
    type Input = GenerateInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "generate"
    }

    async fn attempt(&self, input: &GenerateInput) -> Result<String, StageError> {
        tokio::task::yield_now().await;
        self.0.produce(input.preset.preset_id)
    }
}

pub struct FakeEnhance(pub Arc<FakeImageStage>);

#[async_trait]
impl Stage for FakeEnhance {
    type Input = EnhanceInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "enhance"
    }

    async fn attempt(&self, input: &EnhanceInput) -> Result<String, StageError> {
        tokio::task::yield_now().await;
        self.0.produce(input.preset_id)
    }
}

/// In-memory tracker that also records every update it receives.
#[derive(Default)]
pub struct RecordingTracker {
    inner: InMemoryProgressTracker,
    pub updates: Mutex<Vec<i32>>,
}

impl RecordingTracker {
    pub fn trace(&self) -> Vec<i32> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressTracker for RecordingTracker {
    async fn create(&self, run_id: RunId) -> Result<(), ProgressError> {
        self.inner.create(run_id).await
    }

    async fn update(&self, run_id: RunId, progress: i32) -> Result<(), ProgressError> {
        self.updates.lock().unwrap().push(progress);
        self.inner.update(run_id, progress).await
    }

    async fn mark_complete(&self, run_id: RunId) -> Result<(), ProgressError> {
        self.inner.mark_complete(run_id).await
    }

    async fn mark_error(&self, run_id: RunId, message: &str) -> Result<(), ProgressError> {
        self.inner.mark_error(run_id, message).await
    }

    async fn get(&self, run_id: RunId) -> Result<Option<ProgressRecord>, ProgressError> {
        self.inner.get(run_id).await
    }

    async fn get_many(
        &self,
        run_ids: &[RunId],
    ) -> Result<HashMap<RunId, Option<ProgressRecord>>, ProgressError> {
        self.inner.get_many(run_ids).await
    }
}
