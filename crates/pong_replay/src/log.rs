//! Recorded detection log format
//!
//! ```json
//! {
//!   "view_size": { "width": 1920.0, "height": 1080.0 },
//!   "throw_labels": ["overhand", "trick"],
//!   "frames": [
//!     { "index": 0, "timestamp": 0.0 },
//!     { "index": 1, "targets": [ ... ], "failed": ["pose"] }
//!   ]
//! }
//! ```
//!
//! Every per-frame field is optional; a missing field is an empty detector result.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use pong_core::detection::{
    Contour, DetectedObject, PoseObservation, TrajectoryObservation, Translation,
};
use pong_core::geometry::Size;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    pub view_size: Size,
    /// Classifier labels, one per completed throw.
    #[serde(default)]
    pub throw_labels: Vec<String>,
    pub frames: Vec<RecordedFrame>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedFrame {
    pub index: u64,
    pub timestamp: f64,
    pub poses: Vec<PoseObservation>,
    pub trajectories: Vec<TrajectoryObservation>,
    pub targets: Vec<DetectedObject>,
    pub translation: Option<Translation>,
    pub contours: Vec<Contour>,
    /// Detectors that failed on this frame (`pose`, `trajectory`, `target`,
    /// `registration`, `contour`).
    pub failed: Vec<String>,
}

impl ReplayLog {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay log: {}", path.display()))?;
        let log: ReplayLog = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse replay log: {}", path.display()))?;
        if log.view_size.is_empty() {
            anyhow::bail!("Replay log has an empty view size: {}", path.display());
        }
        Ok(log)
    }
}
