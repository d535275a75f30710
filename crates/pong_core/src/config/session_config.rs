//! Session rules

use serde::{Deserialize, Serialize};

use crate::geometry::Size;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Throws per player before the summary.
    pub max_throws: u32,
    /// Preview surface size; all regions are expressed in this space.
    pub view_size: Size,
    /// m/s → mph
    pub mph_factor: f64,
    /// Release speed smoothing divisor applied after unit conversion.
    pub release_speed_divisor: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_throws: 6,
            view_size: Size::new(1920.0, 1080.0),
            mph_factor: 2.24,
            release_speed_divisor: 6.0,
        }
    }
}
