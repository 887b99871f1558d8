//! fal.ai queue API.
//!
//! Jobs are queued under a model path and addressed by `request_id`.
//! Status and result live on separate endpoints. Status words are
//! `IN_QUEUE`, `IN_PROGRESS` and `COMPLETED`; a completed request that
//! carries an `error` failed.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::http::{error_text, send_json, str_field};
use crate::job::{JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission};
use crate::provider::Provider;

const PROVIDER: &str = "fal";

/// Default queue root.
pub const DEFAULT_BASE_URL: &str = "https://queue.fal.run";

/// HTTP client for the fal.ai queue API.
pub struct FalClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FalClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn get(&self, url: String) -> Result<serde_json::Value, ProviderError> {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.auth());
        send_json(PROVIDER, request).await
    }
}

#[async_trait]
impl Provider for FalClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        let request = self
            .client
            .post(format!("{}/{}", self.base_url, spec.model))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&spec.input);
        let body = send_json(PROVIDER, request).await?;

        // Synchronous endpoints answer with the result directly.
        if let Ok(output) = extract_output(&body) {
            return Ok(Submission {
                handle: JobHandle {
                    id: str_field(&body, "request_id").unwrap_or("sync").to_string(),
                    model: spec.model.clone(),
                },
                status: NormalizedStatus::Succeeded,
                output: Some(output),
            });
        }

        let request_id = str_field(&body, "request_id")
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "queue response has no request_id"))?;
        Ok(Submission {
            handle: JobHandle {
                id: request_id.to_string(),
                model: spec.model.clone(),
            },
            status: normalize_status(&body),
            output: None,
        })
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        let body = self
            .get(format!(
                "{}/{}/requests/{}/status",
                self.base_url, handle.model, handle.id
            ))
            .await?;
        Ok(normalize_status(&body))
    }

    async fn fetch_result(&self, handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        let body = self
            .get(format!("{}/{}/requests/{}", self.base_url, handle.model, handle.id))
            .await?;
        extract_output(&body)
    }
}

/// Map a queue status body to the shared status vocabulary.
pub fn normalize_status(body: &serde_json::Value) -> NormalizedStatus {
    match str_field(body, "status") {
        Some("COMPLETED") => match error_text(body) {
            Some(message) => NormalizedStatus::failed(message),
            None => NormalizedStatus::Succeeded,
        },
        Some("FAILED") | Some("ERROR") => NormalizedStatus::failed(
            error_text(body).unwrap_or_else(|| "Unknown error".to_string()),
        ),
        Some("IN_PROGRESS") => NormalizedStatus::Running,
        _ => NormalizedStatus::Queued,
    }
}

/// Collect image URLs from `images[].url` or `image.url`.
pub fn extract_output(body: &serde_json::Value) -> Result<ProviderOutput, ProviderError> {
    let mut urls: Vec<String> = body
        .get("images")
        .and_then(serde_json::Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|img| str_field(img, "url").map(str::to_owned))
                .collect()
        })
        .unwrap_or_default();
    if urls.is_empty() {
        if let Some(url) = body.get("image").and_then(|img| str_field(img, "url")) {
            urls.push(url.to_string());
        }
    }
    if urls.is_empty() {
        return Err(ProviderError::malformed(PROVIDER, "result has no images"));
    }
    Ok(ProviderOutput::Urls(urls))
}

/// Input body for an image edit model on the queue API.
pub fn edit_request(prompt: &str, image_urls: &[String]) -> serde_json::Value {
    serde_json::json!({
        "prompt": prompt,
        "image_urls": image_urls,
        "num_images": 1,
        "enable_safety_checker": true,
    })
}
