//! Replicate predictions API.
//!
//! Predictions are created asynchronously and polled by id. Status words
//! are `starting`, `processing`, `succeeded`, `failed` and `canceled`.
//! Output is either a single value or a list of values.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ProviderError;
use crate::http::{error_text, send_json, str_field};
use crate::job::{
    looks_like_url, string_list, JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission,
};
use crate::provider::Provider;

const PROVIDER: &str = "replicate";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// HTTP client for the Replicate predictions API.
pub struct ReplicateClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ReplicateClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Token {}", self.api_token)
    }

    /// Endpoint and body for creating a prediction.
    ///
    /// `owner/name` models use the model-scoped endpoint; anything else is
    /// treated as a version hash.
    fn create_request(&self, spec: &JobSpec) -> (String, serde_json::Value) {
        if spec.model.contains('/') {
            (
                format!("{}/models/{}/predictions", self.base_url, spec.model),
                json!({ "input": spec.input }),
            )
        } else {
            (
                format!("{}/predictions", self.base_url),
                json!({ "version": spec.model, "input": spec.input }),
            )
        }
    }

    async fn get_prediction(&self, id: &str) -> Result<serde_json::Value, ProviderError> {
        let request = self
            .client
            .get(format!("{}/predictions/{id}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth());
        send_json(PROVIDER, request).await
    }
}

#[async_trait]
impl Provider for ReplicateClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        let (url, body) = self.create_request(spec);
        let request = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&body);
        let prediction = send_json(PROVIDER, request).await?;

        let id = str_field(&prediction, "id")
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "prediction response has no id"))?;
        let status = normalize_status(&prediction);
        let output = match status {
            NormalizedStatus::Succeeded => extract_output(&prediction).ok(),
            _ => None,
        };

        Ok(Submission {
            handle: JobHandle {
                id: id.to_string(),
                model: spec.model.clone(),
            },
            status,
            output,
        })
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        let prediction = self.get_prediction(&handle.id).await?;
        Ok(normalize_status(&prediction))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        let prediction = self.get_prediction(&handle.id).await?;
        extract_output(&prediction)
    }
}

/// Map a prediction body to the shared status vocabulary.
///
/// Unknown status words are treated as still running.
pub fn normalize_status(prediction: &serde_json::Value) -> NormalizedStatus {
    match str_field(prediction, "status") {
        Some("starting") => NormalizedStatus::Queued,
        Some("succeeded") => NormalizedStatus::Succeeded,
        Some("failed") => NormalizedStatus::failed(
            error_text(prediction).unwrap_or_else(|| "Unknown error".to_string()),
        ),
        Some("canceled") => NormalizedStatus::failed("Prediction was canceled"),
        _ => NormalizedStatus::Running,
    }
}

/// Read `output` from a succeeded prediction.
///
/// All-URL outputs become [`ProviderOutput::Urls`]. Anything else is
/// language model output streamed as tokens, joined into one string.
pub fn extract_output(prediction: &serde_json::Value) -> Result<ProviderOutput, ProviderError> {
    let raw = prediction
        .get("output")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "prediction has no output"))?;
    let parts = string_list(raw);
    if parts.is_empty() {
        return Err(ProviderError::malformed(PROVIDER, "prediction output is empty"));
    }
    if parts.iter().all(|p| looks_like_url(p)) {
        Ok(ProviderOutput::Urls(parts))
    } else {
        Ok(ProviderOutput::Text(parts.concat()))
    }
}

/// Input body for a multimodal chat model (image(s) + prompt in, text out).
pub fn vision_input(
    prompt: &str,
    image_urls: &[String],
    system_prompt: Option<&str>,
    max_tokens: u32,
) -> serde_json::Value {
    let mut input = json!({
        "prompt": prompt,
        "image_input": image_urls,
        "max_tokens": max_tokens,
        "temperature": 0,
    });
    if let Some(system) = system_prompt {
        input["system_prompt"] = json!(system);
    }
    input
}
