//! Wavespeed predictions API.
//!
//! Fields appear either at the top level or nested under `data`,
//! depending on the endpoint. A `completed` prediction is only treated as
//! succeeded once it actually carries outputs.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ProviderError;
use crate::http::{error_text, send_json};
use crate::job::{string_list, JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission};
use crate::provider::Provider;

const PROVIDER: &str = "wavespeed";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.wavespeed.ai/api/v3";

/// HTTP client for the Wavespeed predictions API.
pub struct WavespeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WavespeedClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get_prediction(&self, id: &str) -> Result<serde_json::Value, ProviderError> {
        let request = self
            .client
            .get(format!("{}/predictions/{id}/result", self.base_url))
            .bearer_auth(&self.api_key);
        send_json(PROVIDER, request).await
    }
}

#[async_trait]
impl Provider for WavespeedClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        let request = self
            .client
            .post(format!("{}/{}", self.base_url, spec.model))
            .bearer_auth(&self.api_key)
            .json(&spec.input);
        let body = send_json(PROVIDER, request).await?;

        let id = field(&body, "id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "prediction response has no id"))?;
        let status = normalize_status(&body);
        let output = match status {
            NormalizedStatus::Succeeded => extract_output(&body).ok(),
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
        let body = self.get_prediction(&handle.id).await?;
        Ok(normalize_status(&body))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        let body = self.get_prediction(&handle.id).await?;
        extract_output(&body)
    }
}

/// Look up `key` at the top level, falling back to `data.key`.
fn field<'a>(body: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    body.get(key)
        .filter(|v| !v.is_null())
        .or_else(|| body.get("data").and_then(|d| d.get(key)).filter(|v| !v.is_null()))
}

fn output_urls(body: &serde_json::Value) -> Vec<String> {
    ["output", "outputs"]
        .iter()
        .find_map(|key| {
            let urls = string_list(field(body, key)?);
            (!urls.is_empty()).then_some(urls)
        })
        .unwrap_or_default()
}

/// Map a prediction body to the shared status vocabulary.
pub fn normalize_status(body: &serde_json::Value) -> NormalizedStatus {
    let status = field(body, "status").and_then(|v| v.as_str());
    match status {
        Some("completed") | Some("succeeded") => {
            if output_urls(body).is_empty() {
                NormalizedStatus::Running
            } else {
                NormalizedStatus::Succeeded
            }
        }
        Some("failed") => {
            let message = error_text(body)
                .or_else(|| body.get("data").and_then(error_text))
                .unwrap_or_else(|| "Unknown error".to_string());
            NormalizedStatus::failed(message)
        }
        Some("created") | Some("pending") => NormalizedStatus::Queued,
        _ => NormalizedStatus::Running,
    }
}

pub fn extract_output(body: &serde_json::Value) -> Result<ProviderOutput, ProviderError> {
    let urls = output_urls(body);
    if urls.is_empty() {
        return Err(ProviderError::malformed(PROVIDER, "prediction has no outputs"));
    }
    Ok(ProviderOutput::Urls(urls))
}

/// Input body for an image edit model.
pub fn edit_request(prompt: &str, image_urls: &[String]) -> serde_json::Value {
    json!({
        "prompt": prompt,
        "images": image_urls,
        "enable_sync_mode": false,
        "enable_base64_output": false,
        "num_inference_steps": 35,
        "guidance_scale": 8,
    })
}
