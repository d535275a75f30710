//! Target calibration thresholds

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SetupConfig {
    /// Object detections must score strictly above this.
    pub min_target_confidence: f32,
    /// Where the player is asked to place the target (normalized, y-up).
    pub guide_region: Rect,
    /// Translation samples needed before stability is judged.
    pub stability_history: usize,
    /// Summed translation (|Σtx| + |Σty|) below which the scene is stable.
    pub max_stability_drift: f64,
    /// Minimum |dx| and |dy| of the outline edge segment (contour space).
    pub contour_diagonal_threshold: f64,
    /// Outline edge points must sit at or above this y (contour space).
    pub contour_min_y: f64,
    /// Real-world length of the detected outline edge, in meters.
    pub table_length_m: f64,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            min_target_confidence: 0.6,
            guide_region: Rect::new(0.7, 0.3, 0.28, 0.3),
            stability_history: 15,
            max_stability_drift: 10.0,
            contour_diagonal_threshold: 0.02,
            contour_min_y: 0.3,
            table_length_m: 1.22,
        }
    }
}
