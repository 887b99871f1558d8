//! Gemini image generation (`generateContent`).
//!
//! The call is synchronous: the submit response already holds the
//! generated image as an `inlineData` part, so there is nothing to poll.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::json;

use crate::error::ProviderError;
use crate::http::{send_json, str_field};
use crate::job::{JobHandle, JobSpec, NormalizedStatus, ProviderOutput, Submission};
use crate::provider::Provider;

const PROVIDER: &str = "gemini";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// An image passed inline to the model.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// HTTP client for Gemini `generateContent`.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Provider for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn submit(&self, spec: &JobSpec) -> Result<Submission, ProviderError> {
        let request = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, spec.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&spec.input);
        let body = send_json(PROVIDER, request).await?;

        let handle = JobHandle {
            id: str_field(&body, "responseId").unwrap_or("inline").to_string(),
            model: spec.model.clone(),
        };

        if let Some(reason) = block_reason(&body) {
            return Ok(Submission {
                handle,
                status: NormalizedStatus::failed(format!("Prompt blocked: {reason}")),
                output: None,
            });
        }

        let output = extract_image(&body)?;
        Ok(Submission {
            handle,
            status: NormalizedStatus::Succeeded,
            output: Some(output),
        })
    }

    async fn fetch_status(&self, _handle: &JobHandle) -> Result<NormalizedStatus, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER,
            operation: "fetch_status",
        })
    }

    async fn fetch_result(&self, _handle: &JobHandle) -> Result<ProviderOutput, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER,
            operation: "fetch_result",
        })
    }
}

/// Build a text-plus-images request asking for an image response.
///
/// Images follow the prompt in the order given.
pub fn image_request(
    prompt: &str,
    images: &[InlineImage],
    aspect_ratio: &str,
    image_size: &str,
) -> serde_json::Value {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut parts = vec![json!({ "text": prompt })];
    parts.extend(images.iter().map(|img| {
        json!({
            "inline_data": {
                "mime_type": img.mime_type,
                "data": engine.encode(&img.bytes),
            }
        })
    }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": {
                "aspectRatio": aspect_ratio,
                "imageSize": image_size,
            }
        }
    })
}

fn block_reason(body: &serde_json::Value) -> Option<&str> {
    body.get("promptFeedback")
        .and_then(|f| str_field(f, "blockReason"))
}

/// Return the first image part of the first candidate.
///
/// A response made only of text parts (or with no candidates) is
/// malformed for an image request.
pub fn extract_image(body: &serde_json::Value) -> Result<ProviderOutput, ProviderError> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "response has no content parts"))?;

    let inline = parts
        .iter()
        .find_map(|part| part.get("inlineData").or_else(|| part.get("inline_data")))
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "response has no image part"))?;

    let data = str_field(inline, "data")
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "image part has no data"))?;
    let mime_type = str_field(inline, "mimeType")
        .or_else(|| str_field(inline, "mime_type"))
        .unwrap_or("image/png");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid base64 image: {e}")))?;

    Ok(ProviderOutput::Image {
        bytes,
        mime_type: mime_type.to_string(),
    })
}
