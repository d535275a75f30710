//! Body pose thresholds

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoseConfig {
    /// Pose history capacity (also the classifier window length).
    pub history_capacity: usize,
    /// Whole-body observation confidence required to derive a player box.
    pub min_body_confidence: f32,
    /// Per-joint confidence required for a joint to count.
    pub min_joint_confidence: f32,
    /// Pose detection is paused for the rest of a flight once this many
    /// observations were buffered during it.
    pub max_in_flight_observations: usize,
    /// Player box is grown by this much on every side (view units).
    pub player_box_inset: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            history_capacity: 90,
            min_body_confidence: 0.6,
            min_joint_confidence: 0.1,
            max_in_flight_observations: 10,
            player_box_inset: 20.0,
        }
    }
}
