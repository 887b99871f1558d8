//! Per-stage audit records persisted alongside a run.

use serde::{Deserialize, Serialize};

use crate::preset::{PresetDetail, SubjectCategory};
use crate::types::PresetId;

/// Result of the analyze stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub category: SubjectCategory,
    /// One-word garment type, e.g. `dress`, `jacket`.
    pub clothing_type: String,
    /// Structured garment attributes as returned by the vision model.
    pub garment_description: serde_json::Value,
    /// Preset rows matching the requested ids and the detected category,
    /// in request order.
    pub preset_details: Vec<PresetDetail>,
}

/// Outcome of one branch within one stage.
///
/// Exactly one of `output_url` / `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub preset_id: PresetId,
    pub preset_name: String,
    pub output_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BranchRecord {
    pub fn succeeded(preset: &PresetDetail, url: impl Into<String>) -> Self {
        Self {
            preset_id: preset.preset_id,
            preset_name: preset.name.clone(),
            output_url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(preset: &PresetDetail, error: impl Into<String>) -> Self {
        Self {
            preset_id: preset.preset_id,
            preset_name: preset.name.clone(),
            output_url: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output_url.is_some()
    }
}

/// Everything the pipeline records for audit/debug, keyed by stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermediateOutputs {
    #[serde(default)]
    pub step_analyze: Option<AnalysisResult>,
    #[serde(default)]
    pub step_generate: Vec<BranchRecord>,
    #[serde(default)]
    pub step_enhance: Vec<BranchRecord>,
}
