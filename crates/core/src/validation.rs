//! Request validation that must run before any stage executes.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::types::PresetId;

/// Maximum number of presets a single run may request.
pub const MAX_PRESETS_PER_RUN: usize = 3;

/// Validate the requested preset ids.
///
/// Rules:
/// - At least one id.
/// - At most [`MAX_PRESETS_PER_RUN`] ids.
/// - No duplicates.
pub fn validate_preset_ids(ids: &[PresetId]) -> Result<(), CoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation(
            "At least one preset id is required".to_string(),
        ));
    }
    if ids.len() > MAX_PRESETS_PER_RUN {
        return Err(CoreError::Validation(format!(
            "At most {MAX_PRESETS_PER_RUN} preset ids may be requested, got {}",
            ids.len()
        )));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(CoreError::Validation(format!(
                "Preset id {id} is requested more than once"
            )));
        }
    }
    Ok(())
}

/// Parse a comma-separated id list such as `"3, 7,12"`.
pub fn parse_id_list(raw: &str) -> Result<Vec<PresetId>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<PresetId>()
                .map_err(|_| CoreError::Validation(format!("Invalid id '{s}'")))
        })
        .collect()
}
