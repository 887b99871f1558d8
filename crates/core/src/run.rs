//! Run lifecycle types.
//!
//! A run is created `pending` when a request is accepted, moves to
//! `running` when a worker picks it up, and reaches exactly one of the
//! terminal states `completed` / `failed`. It never moves backward.

use serde::{Deserialize, Serialize};

use crate::outputs::IntermediateOutputs;
use crate::types::{PresetId, RunId, Timestamp};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `true` for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    ///
    /// Terminal states accept no further transition; `pending` may go
    /// straight to a terminal state (e.g. a run that fails before pickup).
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending | Self::Running, Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored reference to an image (public URL in object storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Inputs required to create a pending run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRun {
    pub person_image_url: String,
    pub garment_image_url: String,
    pub preset_ids: Vec<PresetId>,
}

/// A persisted run record as seen by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub status: RunStatus,
    pub person_image_url: String,
    pub garment_image_url: String,
    pub preset_ids: Vec<PresetId>,
    /// Last progress value written for this run (0-100).
    pub progress_percent: i16,
    pub intermediate_outputs: Option<IntermediateOutputs>,
    pub outputs: Vec<ImageRef>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl RunRecord {
    /// The inputs this run was created with.
    pub fn inputs(&self) -> NewRun {
        NewRun {
            person_image_url: self.person_image_url.clone(),
            garment_image_url: self.garment_image_url.clone(),
            preset_ids: self.preset_ids.clone(),
        }
    }
}
