use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::runs;
use crate::state::AppState;

/// Run submission and polling routes, mounted at `/runs`.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(runs::create_run)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_bytes)),
        )
        .route("/progress", get(runs::get_progress_batch))
        .route("/{id}", get(runs::get_run))
        .route("/{id}/progress", get(runs::get_progress))
}
