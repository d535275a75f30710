//! Trajectory filtering thresholds

use serde::{Deserialize, Serialize};

/// Thresholds used by the trajectory accumulator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Trajectory sets must score strictly above this to be considered.
    pub min_trajectory_confidence: f32,
    /// Largest plausible jump (view units) between a new sample's start and the
    /// current path end (or the sample's own end while idle).
    pub max_displacement: f64,
    /// Consecutive rejected / empty frames tolerated while in flight.
    pub frame_limit: u32,
    /// Keeps the re-centred ROI from overlapping the target region (view units).
    pub roi_overlap_buffer: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_trajectory_confidence: 0.9,
            max_displacement: 250.0,
            frame_limit: 20,
            roi_overlap_buffer: 50.0,
        }
    }
}
