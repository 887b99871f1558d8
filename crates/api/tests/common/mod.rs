#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wardrobe_api::config::ServerConfig;
use wardrobe_api::router::build_app_router;
use wardrobe_api::state::AppState;
use wardrobe_core::outputs::AnalysisResult;
use wardrobe_core::preset::{PresetDetail, SubjectCategory};
use wardrobe_db::InMemoryRunStore;
use wardrobe_pipeline::stages::{AnalyzeInput, EnhanceInput, GenerateInput};
use wardrobe_pipeline::{
    FanOut, InMemoryProgressTracker, PipelineDriver, PipelineStages, RetryPolicy, Stage,
    StageError, StageExecutor,
};
use wardrobe_storage::MemoryStorage;
use wardrobe_worker::RunLauncher;

pub const BOUNDARY: &str = "wardrobe-test-boundary";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRfake";
pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIFfake";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 64 * 1024,
        inline_execution: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRunStore>,
    pub tracker: Arc<InMemoryProgressTracker>,
    pub storage: Arc<MemoryStorage>,
    pub launcher: Option<RunLauncher>,
}

/// Router over in-memory collaborators. With `launcher`, accepted runs
/// execute inline through stub stages.
pub fn build_test_app(with_launcher: bool) -> TestApp {
    let config = test_config();
    let store = Arc::new(InMemoryRunStore::new());
    let tracker = Arc::new(InMemoryProgressTracker::new());
    let storage = Arc::new(MemoryStorage::default());

    let launcher = with_launcher.then(|| {
        let stages = PipelineStages {
            analyze: StageExecutor::new(Arc::new(StubAnalyze), RetryPolicy::immediate(1)),
            generate: StageExecutor::new(Arc::new(StubGenerate), RetryPolicy::immediate(1)),
            enhance: StageExecutor::new(Arc::new(StubEnhance), RetryPolicy::immediate(1)),
        };
        let driver = PipelineDriver::new(stages, FanOut::default(), store.clone(), tracker.clone());
        RunLauncher::new(Arc::new(driver))
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        pool: None,
        store: store.clone(),
        tracker: tracker.clone(),
        storage: storage.clone(),
        launcher: launcher.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        tracker,
        storage,
        launcher,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// One multipart part: `(field name, optional file name, bytes)`.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

struct StubAnalyze;

#[async_trait]
impl Stage for StubAnalyze {
    type Input = AnalyzeInput;
    type Output = AnalysisResult;

    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn attempt(&self, input: &AnalyzeInput) -> Result<AnalysisResult, StageError> {
        Ok(AnalysisResult {
            category: SubjectCategory::Woman,
            clothing_type: "dress".into(),
            garment_description: serde_json::json!({"clothing_type": "dress"}),
            preset_details: input
                .preset_ids
                .iter()
                .map(|id| PresetDetail {
                    preset_id: *id,
                    name: format!("Preset {id}"),
                    category: SubjectCategory::Woman,
                    ref_image_url: format!("https://cdn.test/ref-{id}.png"),
                    description: "garden".into(),
                    pose: None,
                    setting: None,
                    lighting: None,
                })
                .collect(),
        })
    }
}

struct StubGenerate;

#[async_trait]
impl Stage for StubGenerate {
    type Input = GenerateInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "generate"
    }

    async fn attempt(&self, input: &GenerateInput) -> Result<String, StageError> {
        Ok(format!("https://cdn.test/gen-{}.png", input.preset.preset_id))
    }
}

struct StubEnhance;

#[async_trait]
impl Stage for StubEnhance {
    type Input = EnhanceInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "enhance"
    }

    async fn attempt(&self, input: &EnhanceInput) -> Result<String, StageError> {
        Ok(format!("https://cdn.test/enh-{}.png", input.preset_id))
    }
}
