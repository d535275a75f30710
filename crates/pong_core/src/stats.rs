//! Per-session player statistics
//!
//! Mutated only on throw completion (`adjust_metrics`) and by the session's
//! reset paths. Speeds, release angles and archived paths outlive `reset()`
//! so the summary screen can still show them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::ThrowType;
use crate::detection::PoseObservation;
use crate::geometry::Point;
use crate::pose::PoseHistoryBuffer;
use crate::scoring::{ScoreEngine, Scoring};
use crate::trajectory::TrajectoryPath;

/// Result of the most recent throw. Overwritten every throw.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrowMetrics {
    pub score: Scoring,
    /// Release speed as shown to the player (mph when calibrated).
    pub speed: f64,
    pub throw_type: ThrowType,
    /// Landing point in view space.
    pub final_location: Point,
    pub landed_in_target: bool,
    /// Elbow→wrist angle in degrees at release, when the arm was visible.
    pub release_angle: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStats {
    pub total_score: u32,
    pub throw_count: u32,
    pub overhand_count: u32,
    pub trick_count: u32,
    pub unclassified_count: u32,
    pub speeds: Vec<f64>,
    pub release_angles: Vec<f64>,
    pub throw_paths: Vec<TrajectoryPath>,
    #[serde(skip)]
    pose_history: PoseHistoryBuffer,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::new(crate::pose::POSE_HISTORY_CAPACITY)
    }
}

impl PlayerStats {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            total_score: 0,
            throw_count: 0,
            overhand_count: 0,
            trick_count: 0,
            unclassified_count: 0,
            speeds: Vec::new(),
            release_angles: Vec::new(),
            throw_paths: Vec::new(),
            pose_history: PoseHistoryBuffer::with_capacity(history_capacity),
        }
    }

    pub fn adjust_metrics(&mut self, metrics: &ThrowMetrics) {
        self.throw_count += 1;
        self.total_score += metrics.score.points();
        match metrics.throw_type {
            ThrowType::Overhand => self.overhand_count += 1,
            ThrowType::Trick => self.trick_count += 1,
            ThrowType::None => self.unclassified_count += 1,
        }
        self.speeds.push(metrics.speed);
        if let Some(angle) = metrics.release_angle {
            self.release_angles.push(angle);
        }
        debug!(
            throw_count = self.throw_count,
            total_score = self.total_score,
            "player stats updated"
        );
    }

    /// New player: zero the counters and drop buffered poses.
    pub fn reset(&mut self) {
        self.total_score = 0;
        self.throw_count = 0;
        self.overhand_count = 0;
        self.trick_count = 0;
        self.unclassified_count = 0;
        self.pose_history.reset();
    }

    /// Between throws: drop buffered poses only.
    pub fn reset_observations(&mut self) {
        self.pose_history.reset();
    }

    pub fn store_path(&mut self, path: TrajectoryPath) {
        self.throw_paths.push(path);
    }

    pub fn store_observation(&mut self, observation: PoseObservation) {
        self.pose_history.store(observation);
    }

    pub fn pose_history(&self) -> &PoseHistoryBuffer {
        &self.pose_history
    }

    pub fn count_for(&self, throw_type: ThrowType) -> u32 {
        match throw_type {
            ThrowType::Overhand => self.overhand_count,
            ThrowType::Trick => self.trick_count,
            ThrowType::None => self.unclassified_count,
        }
    }

    pub fn average_speed(&self) -> Option<f64> {
        average(&self.speeds)
    }

    pub fn top_speed(&self) -> Option<f64> {
        self.speeds.iter().copied().reduce(f64::max)
    }

    pub fn average_release_angle(&self) -> Option<f64> {
        average(&self.release_angles)
    }

    pub fn summary(&self, max_throws: u32) -> SessionSummary {
        SessionSummary {
            total_score: self.total_score,
            max_score: ScoreEngine::max_session_score(max_throws),
            throw_count: self.throw_count,
            overhand_count: self.overhand_count,
            trick_count: self.trick_count,
            unclassified_count: self.unclassified_count,
            average_speed: self.average_speed(),
            top_speed: self.top_speed(),
            average_release_angle: self.average_release_angle(),
            throw_paths: self.throw_paths.clone(),
        }
    }
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// What the summary screen shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_score: u32,
    pub max_score: u32,
    pub throw_count: u32,
    pub overhand_count: u32,
    pub trick_count: u32,
    pub unclassified_count: u32,
    pub average_speed: Option<f64>,
    pub top_speed: Option<f64>,
    pub average_release_angle: Option<f64>,
    pub throw_paths: Vec<TrajectoryPath>,
}
