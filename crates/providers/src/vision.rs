//! Single-shot image description over a multimodal chat model.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::job::{JobSpec, ProviderOutput};
use crate::polling::{run_to_completion, PollConfig};
use crate::provider::Provider;
use crate::replicate::vision_input;

/// Images plus a prompt in, text out.
#[derive(Clone)]
pub struct VisionClient {
    provider: Arc<dyn Provider>,
    model: String,
    poll: PollConfig,
}

impl VisionClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            poll,
        }
    }

    /// Describe `image_urls` according to `prompt`. The returned text is
    /// trimmed; an empty answer is a malformed response.
    pub async fn describe(
        &self,
        image_urls: &[String],
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let spec = JobSpec::new(
            self.model.clone(),
            vision_input(prompt, image_urls, system_prompt, max_tokens),
        );
        let text = match run_to_completion(self.provider.as_ref(), &spec, &self.poll).await? {
            ProviderOutput::Text(text) => text,
            // A one-token answer can look like anything; keep it verbatim.
            ProviderOutput::Urls(parts) => parts.concat(),
            other => {
                return Err(ProviderError::malformed(
                    self.provider.name(),
                    format!("expected text output, got {}", other.kind()),
                ))
            }
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::malformed(self.provider.name(), "empty text output"));
        }
        Ok(text.to_string())
    }
}
