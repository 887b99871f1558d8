//! Run submission, lookup and progress polling over in-memory state.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_multipart, JPEG, PNG};
use wardrobe_core::run::RunStatus;
use wardrobe_core::store::RunStore;
use wardrobe_pipeline::ProgressTracker;

const RUNS: &str = "/api/v1/runs";

#[tokio::test]
async fn accepted_run_is_pending_with_zero_progress() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router.clone(),
        RUNS,
        &[
            ("person_image", Some("me.png"), PNG),
            ("clothing_image", Some("dress.jpg"), JPEG),
            ("preset_ids", None, b"3,7"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    let run_id = json["data"]["run_id"].as_i64().unwrap();
    assert_eq!(json["data"]["status"], "pending");

    let run = app.store.get_by_id(run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Pending);
    assert_eq!(run.preset_ids, vec![3, 7]);
    assert!(run.person_image_url.ends_with(".png"));
    assert!(run.garment_image_url.ends_with(".jpg"));
    assert_eq!(app.storage.len(), 2);

    let progress = body_json(get(app.router, &format!("{RUNS}/{run_id}/progress")).await).await;
    assert_eq!(progress["data"]["progress"], 0);
    assert_eq!(progress["data"]["is_complete"], false);
    assert!(progress["data"]["error"].is_null());
}

#[tokio::test]
async fn too_many_presets_are_rejected_before_upload() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router,
        RUNS,
        &[
            ("person_image", Some("me.png"), PNG),
            ("clothing_image", Some("dress.png"), PNG),
            ("preset_ids", None, b"1,2,3,4"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn missing_image_is_a_bad_request() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router,
        RUNS,
        &[("person_image", Some("me.png"), PNG), ("preset_ids", None, b"1")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("clothing_image"));
}

#[tokio::test]
async fn non_image_upload_is_unsupported() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router,
        RUNS,
        &[
            ("person_image", Some("me.png"), b"not an image at all"),
            ("clothing_image", Some("dress.png"), PNG),
            ("preset_ids", None, b"1"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = build_test_app(false);
    let mut big = PNG.to_vec();
    big.resize(128 * 1024, 0);
    let response = post_multipart(
        app.router,
        RUNS,
        &[
            ("person_image", Some("me.png"), &big),
            ("clothing_image", Some("dress.png"), PNG),
            ("preset_ids", None, b"1"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.store.get_by_id(1).await.unwrap().map(|r| r.id), None);
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let app = build_test_app(false);

    let response = get(app.router.clone(), &format!("{RUNS}/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app.router, &format!("{RUNS}/42/progress")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn batch_progress_maps_unknown_ids_to_null() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router.clone(),
        RUNS,
        &[
            ("person_image", Some("me.png"), PNG),
            ("clothing_image", Some("dress.png"), PNG),
            ("preset_ids", None, b"[5]"),
        ],
    )
    .await;
    let run_id = body_json(response).await["data"]["run_id"].as_i64().unwrap();

    let response = get(app.router.clone(), &format!("{RUNS}/progress?ids={run_id},999")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][run_id.to_string()]["progress"], 0);
    assert!(json["data"]["999"].is_null());

    let response = get(app.router, &format!("{RUNS}/progress?ids=")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inline_execution_completes_the_run() {
    let app = build_test_app(true);
    let response = post_multipart(
        app.router.clone(),
        RUNS,
        &[
            ("person_image", Some("me.png"), PNG),
            ("garment_image", Some("dress.png"), PNG),
            ("preset_ids", None, b"1,2"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let run_id = body_json(response).await["data"]["run_id"].as_i64().unwrap();

    let launcher = app.launcher.as_ref().unwrap();
    assert!(launcher.shutdown(Duration::from_secs(5)).await);

    let progress = body_json(get(app.router.clone(), &format!("{RUNS}/{run_id}/progress")).await).await;
    assert_eq!(progress["data"]["progress"], 100);
    assert_eq!(progress["data"]["is_complete"], true);
    assert!(progress["data"]["error"].is_null());

    let run = body_json(get(app.router, &format!("{RUNS}/{run_id}")).await).await;
    assert_eq!(run["data"]["status"], "completed");
    assert_eq!(run["data"]["outputs"].as_array().unwrap().len(), 2);
    assert_eq!(
        run["data"]["intermediate_outputs"]["step_generate"][0]["output_url"],
        "https://cdn.test/gen-1.png"
    );
}

#[tokio::test]
async fn run_record_reports_live_progress() {
    let app = build_test_app(false);
    let response = post_multipart(
        app.router.clone(),
        RUNS,
        &[
            ("person_image", Some("me.png"), PNG),
            ("clothing_image", Some("dress.jpg"), JPEG),
            ("preset_ids", None, b"1"),
        ],
    )
    .await;
    let run_id = body_json(response).await["data"]["run_id"].as_i64().unwrap();

    app.tracker.update(run_id, 41).await.unwrap();
    app.tracker.mark_error(run_id, "Analysis failed").await.unwrap();
    app.store.update_error(run_id, "Analysis failed").await.unwrap();

    let json = body_json(get(app.router, &format!("{RUNS}/{run_id}")).await).await;
    assert_eq!(json["data"]["status"], "failed");
    assert_eq!(json["data"]["progress_percent"], 41);
}
