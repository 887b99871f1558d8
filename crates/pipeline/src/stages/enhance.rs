use std::sync::Arc;

use async_trait::async_trait;
use wardrobe_core::store::ObjectStorage;
use wardrobe_core::types::PresetId;
use wardrobe_providers::fetch::ImageFetcher;
use wardrobe_providers::vision::VisionClient;
use wardrobe_providers::{fal, run_to_completion, wavespeed, JobSpec, PollConfig, Provider};

use super::store_image;
use crate::error::StageError;
use crate::prompts;
use crate::stage::Stage;

const ENHANCE_PROMPT_MAX_TOKENS: u32 = 300;

/// One surviving branch's enhancement unit.
#[derive(Debug, Clone)]
pub struct EnhanceInput {
    pub preset_id: PresetId,
    /// URL of the generated image to enhance.
    pub image_url: String,
    pub clothing_type: String,
}

/// Which edit API performs the enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBackend {
    Wavespeed,
    Fal,
}

impl EditBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wavespeed" => Some(Self::Wavespeed),
            "fal" => Some(Self::Fal),
            _ => None,
        }
    }

    fn request(self, prompt: &str, image_urls: &[String]) -> serde_json::Value {
        match self {
            Self::Wavespeed => wavespeed::edit_request(prompt, image_urls),
            Self::Fal => fal::edit_request(prompt, image_urls),
        }
    }
}

/// Derives an enhancement prompt from the generated image, runs an edit
/// job to completion and stores the result.
pub struct EnhanceStage {
    vision: VisionClient,
    editor: Arc<dyn Provider>,
    backend: EditBackend,
    model: String,
    poll: PollConfig,
    fetcher: ImageFetcher,
    storage: Arc<dyn ObjectStorage>,
}

impl EnhanceStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vision: VisionClient,
        editor: Arc<dyn Provider>,
        backend: EditBackend,
        model: impl Into<String>,
        poll: PollConfig,
        fetcher: ImageFetcher,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            vision,
            editor,
            backend,
            model: model.into(),
            poll,
            fetcher,
            storage,
        }
    }
}

#[async_trait]
impl Stage for EnhanceStage {
    type Input = EnhanceInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "enhance"
    }

    async fn attempt(&self, input: &EnhanceInput) -> Result<String, StageError> {
        let image_urls = vec![input.image_url.clone()];
        let derived = self
            .vision
            .describe(
                &image_urls,
                prompts::ENHANCE_PROMPT,
                Some(prompts::ENHANCE_SYSTEM_PROMPT),
                ENHANCE_PROMPT_MAX_TOKENS,
            )
            .await?;
        let prompt = prompts::enhance_prompt(&input.clothing_type, &derived);

        let spec = JobSpec::new(self.model.clone(), self.backend.request(&prompt, &image_urls));
        let output = run_to_completion(self.editor.as_ref(), &spec, &self.poll).await?;
        let image = self.fetcher.materialize(output).await?;
        let url = store_image(self.storage.as_ref(), image).await?;

        tracing::debug!(preset_id = input.preset_id, url = %url, "Enhanced image stored");
        Ok(url)
    }
}
