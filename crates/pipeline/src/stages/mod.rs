//! Concrete pipeline stages and their unit inputs.

mod analyze;
mod enhance;
mod generate;

pub use analyze::{parse_garment_description, AnalyzeInput, AnalyzeStage};
pub use enhance::{EditBackend, EnhanceInput, EnhanceStage};
pub use generate::{GenerateInput, GenerateStage};

use wardrobe_core::naming::{extension_for_mime_type, generate_object_name};
use wardrobe_core::store::ObjectStorage;
use wardrobe_providers::fetch::FetchedImage;

use crate::error::StageError;

/// Upload an image under a fresh object name and return its public URL.
pub(crate) async fn store_image(
    storage: &dyn ObjectStorage,
    image: FetchedImage,
) -> Result<String, StageError> {
    if image.bytes.is_empty() {
        return Err(StageError::InvalidOutput("image has no bytes".into()));
    }
    let name = generate_object_name(extension_for_mime_type(&image.mime_type));
    let url = storage.upload(image.bytes, &name, &image.mime_type).await?;
    Ok(url)
}
