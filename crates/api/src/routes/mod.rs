pub mod health;
pub mod runs;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /runs                     submit a run (POST, multipart)
/// /runs/progress?ids=1,2    batch progress (GET)
/// /runs/{id}                run record (GET)
/// /runs/{id}/progress       progress of one run (GET)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new().nest("/runs", runs::router(config.max_upload_bytes))
}
