//! Handlers for run submission and progress polling.

use std::collections::BTreeMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use wardrobe_core::error::CoreError;
use wardrobe_core::naming::generate_object_name;
use wardrobe_core::progress::ProgressRecord;
use wardrobe_core::run::{NewRun, RunRecord, RunStatus};
use wardrobe_core::types::RunId;
use wardrobe_core::validation::{parse_id_list, validate_preset_ids};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Most run ids accepted by one batch progress query.
pub const MAX_BATCH_PROGRESS_IDS: usize = 100;

/// An uploaded image whose format has been sniffed from its bytes.
#[derive(Debug)]
struct UploadedImage {
    bytes: Vec<u8>,
    extension: &'static str,
    content_type: &'static str,
}

impl UploadedImage {
    /// Accept PNG, JPEG and WebP, judged by content rather than file name.
    fn sniff(field: &str, bytes: Vec<u8>) -> AppResult<Self> {
        if bytes.is_empty() {
            return Err(AppError::BadRequest(format!("'{field}' is empty")));
        }
        let (extension, content_type) = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => ("png", "image/png"),
            Ok(ImageFormat::Jpeg) => ("jpg", "image/jpeg"),
            Ok(ImageFormat::WebP) => ("webp", "image/webp"),
            _ => {
                return Err(AppError::UnsupportedMediaType(format!(
                    "'{field}' must be a PNG, JPEG or WebP image"
                )))
            }
        };
        Ok(Self {
            bytes,
            extension,
            content_type,
        })
    }

    async fn store(self, state: &AppState) -> AppResult<String> {
        let name = generate_object_name(self.extension);
        Ok(state
            .storage
            .upload(self.bytes, &name, self.content_type)
            .await?)
    }
}

/// Accept `"1,2,3"` as well as `"[1, 2, 3]"`.
fn parse_preset_ids(raw: &str) -> AppResult<Vec<i64>> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    Ok(parse_id_list(trimmed)?)
}

#[derive(Debug, Serialize)]
pub struct RunAccepted {
    pub run_id: RunId,
    pub status: RunStatus,
}

/// POST /api/v1/runs
///
/// Multipart form with `person_image`, `clothing_image` (or
/// `garment_image`) and `preset_ids`. Stores both images, creates a
/// pending run and returns 202 without waiting for the pipeline.
pub async fn create_run(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<RunAccepted>>)> {
    let mut person: Option<Vec<u8>> = None;
    let mut garment: Option<Vec<u8>> = None;
    let mut preset_ids: Option<Vec<i64>> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "person_image" => person = Some(field.bytes().await?.to_vec()),
            "clothing_image" | "garment_image" => garment = Some(field.bytes().await?.to_vec()),
            "preset_ids" => preset_ids = Some(parse_preset_ids(&field.text().await?)?),
            _ => {}
        }
    }

    let preset_ids = preset_ids
        .ok_or_else(|| AppError::BadRequest("Missing required 'preset_ids' field".into()))?;
    validate_preset_ids(&preset_ids)?;

    let person = person
        .ok_or_else(|| AppError::BadRequest("Missing required 'person_image' field".into()))?;
    let garment = garment
        .ok_or_else(|| AppError::BadRequest("Missing required 'clothing_image' field".into()))?;
    let person = UploadedImage::sniff("person_image", person)?;
    let garment = UploadedImage::sniff("clothing_image", garment)?;

    let inputs = NewRun {
        person_image_url: person.store(&state).await?,
        garment_image_url: garment.store(&state).await?,
        preset_ids,
    };
    let run = state.store.create_pending(&inputs).await?;
    if let Err(e) = state.tracker.create(run.id).await {
        tracing::warn!(run_id = run.id, error = %e, "Failed to initialise progress");
    }
    tracing::info!(run_id = run.id, presets = ?inputs.preset_ids, "Run accepted");

    if let Some(launcher) = &state.launcher {
        launcher.launch(run.id, inputs);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: RunAccepted {
                run_id: run.id,
                status: run.status,
            },
        }),
    ))
}

/// GET /api/v1/runs/{id}
///
/// `progress_percent` is taken from the progress tracker, which owns the
/// live value in both deployment shapes.
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
) -> AppResult<Json<DataResponse<RunRecord>>> {
    let mut run = state
        .store
        .get_by_id(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Run", id })?;
    if let Some(progress) = state.tracker.get(id).await? {
        run.progress_percent = progress.progress;
    }
    Ok(Json(DataResponse { data: run }))
}

/// GET /api/v1/runs/{id}/progress
///
/// An unknown run is a 404, distinct from a run that failed.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
) -> AppResult<Json<DataResponse<ProgressRecord>>> {
    let record = state
        .tracker
        .get(id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Run", id })?;
    Ok(Json(DataResponse { data: record }))
}

#[derive(Debug, Deserialize)]
pub struct BatchProgressQuery {
    /// Comma-separated run ids.
    pub ids: String,
}

/// GET /api/v1/runs/progress?ids=1,2,3
///
/// Returns a map keyed by run id; unknown ids map to `null`.
pub async fn get_progress_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchProgressQuery>,
) -> AppResult<Json<DataResponse<BTreeMap<RunId, Option<ProgressRecord>>>>> {
    let ids = parse_id_list(&query.ids)?;
    if ids.is_empty() {
        return Err(AppError::BadRequest("'ids' must list at least one run id".into()));
    }
    if ids.len() > MAX_BATCH_PROGRESS_IDS {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_BATCH_PROGRESS_IDS} run ids may be queried at once"
        )));
    }
    let records = state.tracker.get_many(&ids).await?;
    Ok(Json(DataResponse {
        data: records.into_iter().collect(),
    }))
}
