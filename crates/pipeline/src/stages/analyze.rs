use std::sync::Arc;

use async_trait::async_trait;
use wardrobe_core::outputs::AnalysisResult;
use wardrobe_core::preset::SubjectCategory;
use wardrobe_core::store::PresetCatalog;
use wardrobe_core::types::PresetId;
use wardrobe_providers::vision::VisionClient;

use crate::error::StageError;
use crate::prompts;
use crate::stage::Stage;

const GENDER_MAX_TOKENS: u32 = 10;
const GARMENT_MAX_TOKENS: u32 = 1000;

/// Everything the analyze stage looks at.
#[derive(Debug, Clone)]
pub struct AnalyzeInput {
    pub person_image_url: String,
    pub garment_image_url: String,
    pub preset_ids: Vec<PresetId>,
}

/// Detects the subject category, describes the garment and resolves the
/// requested presets for that category.
///
/// Zero matching presets is a valid result here; the driver decides that
/// it is fatal.
pub struct AnalyzeStage {
    vision: VisionClient,
    catalog: Arc<dyn PresetCatalog>,
}

impl AnalyzeStage {
    pub fn new(vision: VisionClient, catalog: Arc<dyn PresetCatalog>) -> Self {
        Self { vision, catalog }
    }
}

#[async_trait]
impl Stage for AnalyzeStage {
    type Input = AnalyzeInput;
    type Output = AnalysisResult;

    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn attempt(&self, input: &AnalyzeInput) -> Result<AnalysisResult, StageError> {
        let answer = self
            .vision
            .describe(
                std::slice::from_ref(&input.person_image_url),
                prompts::GENDER_PROMPT,
                Some(prompts::GENDER_SYSTEM_PROMPT),
                GENDER_MAX_TOKENS,
            )
            .await?;
        let category = SubjectCategory::parse_answer(&answer)
            .map_err(|e| StageError::InvalidOutput(e.to_string()))?;

        let raw_garment = self
            .vision
            .describe(
                std::slice::from_ref(&input.garment_image_url),
                prompts::GARMENT_PROMPT,
                Some(prompts::GARMENT_SYSTEM_PROMPT),
                GARMENT_MAX_TOKENS,
            )
            .await?;
        let (clothing_type, garment_description) = parse_garment_description(&raw_garment)?;

        let preset_details = self
            .catalog
            .get_details_by_ids_and_category(&input.preset_ids, category)
            .await?;

        tracing::info!(
            category = %category,
            clothing_type = %clothing_type,
            requested = input.preset_ids.len(),
            matched = preset_details.len(),
            "Analysis complete",
        );

        Ok(AnalysisResult {
            category,
            clothing_type,
            garment_description,
            preset_details,
        })
    }
}

/// Parse the garment description returned by the vision model.
///
/// Accepts the object bare or wrapped in a Markdown code fence. The object
/// must carry a non-empty `clothing_type` string, which is returned
/// lowercased alongside the full object.
pub fn parse_garment_description(
    raw: &str,
) -> Result<(String, serde_json::Value), StageError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| StageError::InvalidOutput(format!("garment description is not JSON: {e}")))?;
    let clothing_type = value
        .get("clothing_type")
        .and_then(serde_json::Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StageError::InvalidOutput("garment description has no clothing_type".into()))?;

    Ok((clothing_type, value))
}
