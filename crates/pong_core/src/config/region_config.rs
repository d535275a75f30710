//! Throw / target region layout

use serde::{Deserialize, Serialize};

/// Offsets used to derive the throw and target regions from the player box
/// and the calibrated target (all view units).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionLayout {
    pub throw_x_buffer: f64,
    pub throw_y_buffer: f64,
    pub throw_width: f64,
    pub target_x_buffer: f64,
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self { throw_x_buffer: 5.0, throw_y_buffer: 50.0, throw_width: 200.0, target_x_buffer: 50.0 }
    }
}
