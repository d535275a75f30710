//! Throw and target regions (view space)
//!
//! Derived from the player box and the calibrated target; recomputed whenever
//! either changes, never stored across sessions.
//!
//! ```text
//!   player box      throw region            target region
//!  +---------+ <5> +--------------+  ...  <50>+-----------+
//!  |         |     |   200 wide   |           |  target   |
//!  +---------+     +--------------+           +-----------+
//! ```

use serde::{Deserialize, Serialize};

use crate::config::RegionLayout;
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrowRegions {
    /// Initial ROI: just in front of the player, from the top of the view down
    /// to a little above the player's feet.
    pub throw_region: Rect,
    /// Target box widened towards the player, from the top of the view down to
    /// the target's bottom edge.
    pub target_region: Rect,
}

impl ThrowRegions {
    pub fn compute(player_box: Rect, target: Rect, layout: &RegionLayout) -> Self {
        let throw_region = Rect::new(
            player_box.max_x() + layout.throw_x_buffer,
            0.0,
            layout.throw_width,
            (player_box.max_y() - layout.throw_y_buffer).max(0.0),
        );
        let target_region = if target.is_empty() {
            Rect::EMPTY
        } else {
            Rect::new(
                target.min_x() - layout.target_x_buffer,
                0.0,
                target.width() + layout.target_x_buffer,
                target.max_y(),
            )
        };
        Self { throw_region, target_region }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_regions() {
        let layout = RegionLayout::default();
        let player = Rect::new(100.0, 200.0, 150.0, 600.0);
        let target = Rect::new(1400.0, 500.0, 200.0, 100.0);

        let regions = ThrowRegions::compute(player, target, &layout);
        assert_eq!(regions.throw_region, Rect::new(255.0, 0.0, 200.0, 750.0));
        assert_eq!(regions.target_region, Rect::new(1350.0, 0.0, 250.0, 600.0));
    }

    #[test]
    fn test_missing_target_gives_empty_target_region() {
        let regions = ThrowRegions::compute(
            Rect::new(0.0, 0.0, 10.0, 20.0),
            Rect::EMPTY,
            &RegionLayout::default(),
        );
        assert!(regions.target_region.is_empty());
        // player shorter than the y buffer: no negative heights
        assert_eq!(regions.throw_region.height(), 0.0);
    }
}
