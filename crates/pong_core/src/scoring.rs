//! Throw scoring and release speed
//!
//! Scoring is flat: a trick throw is worth 4, every other completed throw 1.
//! Where exactly the ball came down inside the target does not matter.

use serde::{Deserialize, Serialize};

use crate::classifier::ThrowType;
use crate::config::SessionConfig;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scoring {
    #[default]
    Zero,
    One,
    Four,
}

impl Scoring {
    /// Best single-throw result.
    pub const MAX: Scoring = Scoring::Four;

    pub fn points(&self) -> u32 {
        match self {
            Scoring::Zero => 0,
            Scoring::One => 1,
            Scoring::Four => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    /// `final_location` is the landing point in view space.
    pub fn score(_final_location: Point, throw_type: ThrowType) -> Scoring {
        match throw_type {
            ThrowType::Trick => Scoring::Four,
            ThrowType::Overhand | ThrowType::None => Scoring::One,
        }
    }

    /// Highest total a session can reach.
    pub fn max_session_score(max_throws: u32) -> u32 {
        max_throws.saturating_mul(Scoring::MAX.points())
    }
}

/// Converts the accumulator's view-space speed (view units / s) into the
/// speed shown to the player.
///
/// With a calibration factor (meters per view unit) the result is mph,
/// smoothed by `release_speed_divisor` and rounded to a whole number.
/// Without one, the raw view speed is reported rounded to two decimals.
pub fn release_speed(view_speed: f64, point_to_meter: Option<f64>, session: &SessionConfig) -> f64 {
    if !view_speed.is_finite() {
        return 0.0;
    }
    match point_to_meter {
        Some(m) if m.is_finite() && m > 0.0 => {
            let mph = (view_speed * m * session.mph_factor * 100.0).round() / 100.0;
            (mph / session.release_speed_divisor).round()
        }
        _ => (view_speed * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trick_scores_four_anywhere() {
        for loc in [Point::ZERO, Point::new(500.0, 200.0), Point::new(-10.0, 9999.0)] {
            assert_eq!(ScoreEngine::score(loc, ThrowType::Trick).points(), 4);
            assert_eq!(ScoreEngine::score(loc, ThrowType::Overhand).points(), 1);
            assert_eq!(ScoreEngine::score(loc, ThrowType::None).points(), 1);
        }
    }

    #[test]
    fn test_max_session_score() {
        assert_eq!(ScoreEngine::max_session_score(6), 24);
        assert_eq!(ScoreEngine::max_session_score(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_release_speed_with_calibration() {
        let session = SessionConfig::default();
        // 1200 units/s * 0.005 m/unit = 6 m/s -> 13.44 mph -> /6 = 2.24 -> 2
        assert_eq!(release_speed(1200.0, Some(0.005), &session), 2.0);
        // 10000 units/s * 0.005 = 50 m/s -> 112 mph -> 18.67 -> 19
        assert_eq!(release_speed(10000.0, Some(0.005), &session), 19.0);
    }

    #[test]
    fn test_release_speed_without_calibration() {
        let session = SessionConfig::default();
        assert_eq!(release_speed(200.0, None, &session), 200.0);
        assert_eq!(release_speed(123.456, Some(f64::NAN), &session), 123.46);
        assert_eq!(release_speed(f64::INFINITY, None, &session), 0.0);
    }
}
