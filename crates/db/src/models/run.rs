//! Row model for the `runs` table.

use sqlx::FromRow;
use wardrobe_core::outputs::IntermediateOutputs;
use wardrobe_core::run::{ImageRef, RunRecord};
use wardrobe_core::store::StoreError;
use wardrobe_core::types::{DbId, Timestamp};

use super::status::{RunStatus, StatusId};

/// A row from the `runs` table.
#[derive(Debug, Clone, FromRow)]
pub struct Run {
    pub id: DbId,
    pub status_id: StatusId,
    pub person_image_url: String,
    pub garment_image_url: String,
    pub preset_ids: Vec<DbId>,
    pub progress_percent: i16,
    pub intermediate_outputs: Option<serde_json::Value>,
    pub outputs: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl TryFrom<Run> for RunRecord {
    type Error = StoreError;

    fn try_from(row: Run) -> Result<Self, Self::Error> {
        let status = RunStatus::from_id(row.status_id).ok_or_else(|| {
            StoreError::Database(format!("Unknown run status id {}", row.status_id))
        })?;
        let intermediate_outputs = row
            .intermediate_outputs
            .map(serde_json::from_value::<IntermediateOutputs>)
            .transpose()?;
        let outputs: Vec<ImageRef> = serde_json::from_value(row.outputs)?;

        Ok(RunRecord {
            id: row.id,
            status: status.into(),
            person_image_url: row.person_image_url,
            garment_image_url: row.garment_image_url,
            preset_ids: row.preset_ids,
            progress_percent: row.progress_percent,
            intermediate_outputs,
            outputs,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wardrobe_core::run::RunStatus as LifecycleStatus;

    fn row(status_id: StatusId) -> Run {
        let now = chrono::Utc::now();
        Run {
            id: 11,
            status_id,
            person_image_url: "https://cdn.test/p.png".into(),
            garment_image_url: "https://cdn.test/g.png".into(),
            preset_ids: vec![1, 2],
            progress_percent: 100,
            intermediate_outputs: Some(serde_json::json!({"step_generate": [], "step_enhance": []})),
            outputs: serde_json::json!([{"url": "https://cdn.test/o.png"}]),
            error_message: None,
            created_at: now,
            started_at: Some(now),
            completed_at: Some(now),
            updated_at: now,
        }
    }

    #[test]
    fn converts_row_with_json_columns() {
        let record = RunRecord::try_from(row(3)).unwrap();
        assert_eq!(record.status, LifecycleStatus::Completed);
        assert_eq!(record.outputs, vec![ImageRef::new("https://cdn.test/o.png")]);
        assert!(record.intermediate_outputs.unwrap().step_analyze.is_none());
    }

    #[test]
    fn unknown_status_id_is_an_error() {
        assert_matches!(RunRecord::try_from(row(42)), Err(StoreError::Database(_)));
    }
}
