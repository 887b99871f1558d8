//! Repository for the `preset_details` table.

use sqlx::PgPool;
use wardrobe_core::preset::SubjectCategory;
use wardrobe_core::types::DbId;

use crate::models::preset::PresetRow;

/// Column list for `preset_details` queries.
const COLUMNS: &str = "id, name, category, ref_image_url, description, pose, setting, lighting";

/// Read access to scene presets.
pub struct PresetRepo;

impl PresetRepo {
    /// Presets among `ids` catalogued for `category`, ordered by id.
    pub async fn find_by_ids_and_category(
        pool: &PgPool,
        ids: &[DbId],
        category: SubjectCategory,
    ) -> Result<Vec<PresetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM preset_details \
             WHERE id = ANY($1) AND category = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, PresetRow>(&query)
            .bind(ids)
            .bind(category.as_str())
            .fetch_all(pool)
            .await
    }
}
