//! Row model for the `preset_details` table.

use sqlx::FromRow;
use wardrobe_core::preset::{PresetDetail, SubjectCategory};
use wardrobe_core::store::StoreError;
use wardrobe_core::types::DbId;

/// A row from the `preset_details` table.
#[derive(Debug, Clone, FromRow)]
pub struct PresetRow {
    pub id: DbId,
    pub name: String,
    pub category: String,
    pub ref_image_url: String,
    pub description: String,
    pub pose: Option<String>,
    pub setting: Option<String>,
    pub lighting: Option<String>,
}

impl TryFrom<PresetRow> for PresetDetail {
    type Error = StoreError;

    fn try_from(row: PresetRow) -> Result<Self, Self::Error> {
        let category = SubjectCategory::parse_answer(&row.category)
            .map_err(|e| StoreError::Database(format!("preset {}: {e}", row.id)))?;
        Ok(PresetDetail {
            preset_id: row.id,
            name: row.name,
            category,
            ref_image_url: row.ref_image_url,
            description: row.description,
            pose: row.pose,
            setting: row.setting,
            lighting: row.lighting,
        })
    }
}
