use std::sync::Arc;

use wardrobe_core::store::{ObjectStorage, RunStore};
use wardrobe_db::DbPool;
use wardrobe_pipeline::ProgressTracker;
use wardrobe_worker::RunLauncher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Present when runs are persisted in PostgreSQL.
    pub pool: Option<DbPool>,
    pub store: Arc<dyn RunStore>,
    pub tracker: Arc<dyn ProgressTracker>,
    pub storage: Arc<dyn ObjectStorage>,
    /// Launches accepted runs in this process. `None` leaves them pending
    /// for a separate worker.
    pub launcher: Option<RunLauncher>,
}
