//! Scene presets: the variants a run may request.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::PresetId;

/// Subject category detected by the analyze stage. Presets are
/// catalogued per category, so a preset only matches a run whose subject
/// falls in the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectCategory {
    Man,
    Woman,
}

impl SubjectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Man => "man",
            Self::Woman => "woman",
        }
    }

    /// Parse a one-word classification answer.
    ///
    /// Tolerates surrounding whitespace, capitalisation and trailing
    /// punctuation (`"Woman."`).
    pub fn parse_answer(answer: &str) -> Result<Self, CoreError> {
        let word = answer
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .to_ascii_lowercase();
        match word.as_str() {
            "man" | "male" => Ok(Self::Man),
            "woman" | "female" => Ok(Self::Woman),
            other => Err(CoreError::Validation(format!(
                "Unrecognised subject category '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for SubjectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One preset row as returned by the preset catalog.
///
/// Pose, setting and lighting are opaque to the pipeline; only the
/// reference image and description are threaded into generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDetail {
    pub preset_id: PresetId,
    pub name: String,
    pub category: SubjectCategory,
    /// Full-resolution scene/pose reference image.
    pub ref_image_url: String,
    /// Natural-language description of the reference scene.
    pub description: String,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default)]
    pub lighting: Option<String>,
}

/// Reorder `details` to follow `ids`, dropping rows that were not asked for.
pub fn order_by_request(ids: &[PresetId], mut details: Vec<PresetDetail>) -> Vec<PresetDetail> {
    details.retain(|d| ids.contains(&d.preset_id));
    details.sort_by_key(|d| ids.iter().position(|id| *id == d.preset_id));
    details.dedup_by_key(|d| d.preset_id);
    details
}
