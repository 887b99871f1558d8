use std::sync::Arc;

use async_trait::async_trait;
use wardrobe_core::preset::PresetDetail;
use wardrobe_core::store::ObjectStorage;
use wardrobe_providers::fetch::{FetchedImage, ImageFetcher};
use wardrobe_providers::gemini::{image_request, InlineImage};
use wardrobe_providers::{run_to_completion, JobSpec, PollConfig, Provider};

use super::store_image;
use crate::error::StageError;
use crate::prompts;
use crate::stage::Stage;

/// One preset's generation unit.
#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub person_image_url: String,
    pub garment_image_url: String,
    pub preset: PresetDetail,
    pub garment_description: serde_json::Value,
}

/// Composes person, garment and scene reference into one image and
/// uploads it.
pub struct GenerateStage {
    provider: Arc<dyn Provider>,
    model: String,
    aspect_ratio: String,
    image_size: String,
    poll: PollConfig,
    fetcher: ImageFetcher,
    storage: Arc<dyn ObjectStorage>,
}

impl GenerateStage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        aspect_ratio: impl Into<String>,
        image_size: impl Into<String>,
        poll: PollConfig,
        fetcher: ImageFetcher,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            aspect_ratio: aspect_ratio.into(),
            image_size: image_size.into(),
            poll,
            fetcher,
            storage,
        }
    }
}

fn inline(image: FetchedImage) -> InlineImage {
    InlineImage {
        bytes: image.bytes,
        mime_type: image.mime_type,
    }
}

#[async_trait]
impl Stage for GenerateStage {
    type Input = GenerateInput;
    type Output = String;

    fn name(&self) -> &'static str {
        "generate"
    }

    async fn attempt(&self, input: &GenerateInput) -> Result<String, StageError> {
        let (person, garment, reference) = tokio::try_join!(
            self.fetcher.fetch(&input.person_image_url),
            self.fetcher.fetch(&input.garment_image_url),
            self.fetcher.fetch(&input.preset.ref_image_url),
        )?;

        let prompt = prompts::generate_prompt(&input.garment_description, &input.preset.description);
        let images = [inline(person), inline(garment), inline(reference)];
        let spec = JobSpec::new(
            self.model.clone(),
            image_request(&prompt, &images, &self.aspect_ratio, &self.image_size),
        );

        let output = run_to_completion(self.provider.as_ref(), &spec, &self.poll).await?;
        let image = self.fetcher.materialize(output).await?;
        let url = store_image(self.storage.as_ref(), image).await?;

        tracing::debug!(preset_id = input.preset.preset_id, url = %url, "Generated image stored");
        Ok(url)
    }
}
