//! Online trajectory accumulator
//!
//! Consumes the per-frame batches produced by the trajectory detector and
//! decides when a throw starts, how it grows, and when it is over.
//!
//! ## Per-sample rules (confidence already above threshold)
//! 1. Convert to view space.
//! 2. Ignore sets that do not move rightward (`last.x <= first.x`).
//! 3. Idle: the start point must lie in the ROI and the sample's own
//!    start→end distance must stay under `max_displacement`.
//!    In flight: start or end must lie in the ROI and the jump from the
//!    accumulated path's end to the sample start must stay under `max_displacement`.
//! 4. Accepted: the first sample fixes the release speed (`distance / duration`)
//!    and seeds the path; later ones are appended. The rejection counter resets.
//! 5. Rejected: the rejection counter grows.
//!
//! ## Completion
//! In flight and either more than `frame_limit` consecutive rejected samples, or
//! more than `frame_limit` consecutive frames with no trajectory at all.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::detection::TrajectoryObservation;
use crate::geometry::{Point, Rect, ViewTransform};
use crate::regions::ThrowRegions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlightPhase {
    #[default]
    Idle,
    InFlight,
}

/// Accumulated polyline in view space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectoryPath {
    points: Vec<Point>,
}

impl TrajectoryPath {
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn extend(&mut self, segment: &[Point]) {
        self.points.extend_from_slice(segment);
    }

    /// End of the path; `Point::ZERO` while empty.
    pub fn current_point(&self) -> Point {
        self.points.last().copied().unwrap_or(Point::ZERO)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrajectoryState {
    pub phase: FlightPhase,
    pub path: TrajectoryPath,
    /// Consecutive rejected samples.
    pub out_of_region: u32,
    /// Consecutive in-flight frames without any trajectory.
    pub missing_frames: u32,
    /// Jump measured for the most recent sample.
    pub distance: f64,
    /// Release speed in view units per second.
    pub speed: f64,
    pub roi: Rect,
    pub target_region: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleVerdict {
    Accepted,
    /// Below the confidence threshold.
    LowConfidence,
    /// Fewer than two points, or not travelling rightward.
    NotMovingForward,
    OutsideRegion,
    TooFar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionCause {
    /// Too many consecutive samples fell outside the ROI.
    OutOfRegion,
    /// The detector stopped reporting the ball (occluded or landed).
    LostTrack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThrowCompletion {
    pub path: TrajectoryPath,
    /// Terminal point, normalized (0..1, y-up).
    pub final_location: Point,
    /// Terminal point in view space.
    pub final_view_location: Point,
    /// Release speed in view units per second.
    pub speed: f64,
    pub cause: CompletionCause,
}

#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    config: TrackingConfig,
    view: ViewTransform,
    state: TrajectoryState,
}

impl TrajectoryAccumulator {
    pub fn new(config: TrackingConfig, view: ViewTransform) -> Self {
        Self { config, view, state: TrajectoryState::default() }
    }

    pub fn state(&self) -> &TrajectoryState {
        &self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.phase == FlightPhase::InFlight
    }

    pub fn speed(&self) -> f64 {
        self.state.speed
    }

    pub fn roi(&self) -> Rect {
        self.state.roi
    }

    pub fn path(&self) -> &TrajectoryPath {
        &self.state.path
    }

    pub fn set_roi(&mut self, roi: Rect) {
        self.state.roi = roi;
    }

    pub fn is_throw_complete(&self) -> bool {
        self.is_in_flight() && self.state.out_of_region > self.config.frame_limit
    }

    /// Drop any in-progress throw and go idle. Regions are kept.
    pub fn reset_path(&mut self) {
        let roi = self.state.roi;
        let target_region = self.state.target_region;
        self.state = TrajectoryState { roi, target_region, ..TrajectoryState::default() };
    }

    /// Fresh start for a new throw: idle, ROI back at the throw region.
    pub fn reset_for_tracking(&mut self, regions: ThrowRegions) {
        self.reset_path();
        self.state.roi = regions.throw_region;
        self.state.target_region = regions.target_region;
    }

    /// Feed one frame's detector output. Returns the completed throw, at most once per flight.
    pub fn process_frame(&mut self, batch: &[TrajectoryObservation]) -> Option<ThrowCompletion> {
        if batch.is_empty() {
            if self.is_in_flight() {
                self.state.missing_frames += 1;
                if self.state.missing_frames > self.config.frame_limit {
                    return Some(self.complete(CompletionCause::LostTrack));
                }
            }
            return None;
        }

        let min_confidence = self.config.min_trajectory_confidence;
        for observation in batch.iter().filter(|o| o.confidence > min_confidence) {
            let verdict = self.ingest(observation);
            debug!(?verdict, out_of_region = self.state.out_of_region, "trajectory sample");
            if !self.state.path.is_empty() {
                self.update_roi();
                if self.is_throw_complete() {
                    return Some(self.complete(CompletionCause::OutOfRegion));
                }
            }
            self.state.missing_frames = 0;
        }
        None
    }

    /// Apply the acceptance rules to a single trajectory set.
    pub fn ingest(&mut self, observation: &TrajectoryObservation) -> SampleVerdict {
        if observation.confidence <= self.config.min_trajectory_confidence {
            return SampleVerdict::LowConfidence;
        }
        if observation.points.len() < 2 || !observation.is_moving_forward() {
            return SampleVerdict::NotMovingForward;
        }

        let points: Vec<Point> =
            observation.points.iter().map(|p| self.view.to_view(p.location)).collect();
        let start = points[0];
        let end = points[points.len() - 1];
        let in_flight = self.is_in_flight();
        let roi = self.state.roi;

        let (within_region, distance) = if in_flight {
            (
                roi.contains(end) || roi.contains(start),
                start.distance(self.state.path.current_point()),
            )
        } else {
            (roi.contains(start), start.distance(end))
        };
        self.state.distance = distance;

        if !within_region {
            self.state.out_of_region += 1;
            return SampleVerdict::OutsideRegion;
        }
        if distance >= self.config.max_displacement {
            self.state.out_of_region += 1;
            return SampleVerdict::TooFar;
        }

        if in_flight {
            self.state.path.extend(&points);
        } else {
            self.state.speed = if observation.duration > 0.0 {
                start.distance(end) / observation.duration
            } else {
                warn!(duration = observation.duration, "trajectory sample without duration");
                0.0
            };
            self.state.path = TrajectoryPath::from_points(points);
            info!(speed = self.state.speed, "throw started");
        }
        self.state.out_of_region = 0;
        self.state.phase = FlightPhase::InFlight;
        SampleVerdict::Accepted
    }

    /// Move the ROI along with the ball: snap to the target once the ball is
    /// over it, otherwise re-centre forward once the ball passes the ROI's middle.
    fn update_roi(&mut self) {
        let location = self.state.path.current_point();
        let target = self.state.target_region;
        let roi = &mut self.state.roi;

        if target.contains(location) {
            if *roi != target {
                debug!("ball over target region");
                *roi = target;
            }
            return;
        }

        let half_width = roi.width() / 2.0;
        if location.x <= roi.mid_x() {
            return;
        }
        let clear_of_target = target.is_empty()
            || location.x + half_width - self.config.roi_overlap_buffer < target.min_x();
        if clear_of_target {
            roi.origin.x = location.x - half_width;
        }
    }

    fn complete(&mut self, cause: CompletionCause) -> ThrowCompletion {
        let final_view_location = self.state.path.current_point();
        let path = std::mem::take(&mut self.state.path);
        let completion = ThrowCompletion {
            final_location: self.view.to_normalized(final_view_location),
            final_view_location,
            speed: self.state.speed,
            path,
            cause,
        };
        info!(
            ?cause,
            points = completion.path.len(),
            length = completion.path.length(),
            speed = completion.speed,
            "throw completed"
        );
        self.reset_path();
        completion
    }
}

// ========== Tests ==========
