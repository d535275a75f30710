//! Game session coordinator
//!
//! Owns every piece of mutable game state (stage machine, setup tracker,
//! trajectory accumulator, player stats) and is the only thing that mutates it.
//! Stage entry actions run here as a loop of sequential `enter` calls, so a
//! chained transition (DetectedPlayer → TrackingThrows) never recurses through
//! observers.
//!
//! Per frame:
//! 1. [`GameSession::plan`] picks the detectors to run.
//! 2. The caller runs them (see [`FrameDetections::run`]).
//! 3. [`GameSession::apply`] folds the results in and drives the stages.

mod plan;


pub use plan::{DetectionPlan, FrameDetections};

use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::classifier::ThrowClassifier;
use crate::config::GameConfig;
use crate::detection::{PoseObservation, TrajectoryObservation, VideoFrame};
use crate::error::DetectionError;
use crate::geometry::{Rect, ViewTransform};
use crate::regions::ThrowRegions;
use crate::scoring::{release_speed, ScoreEngine};
use crate::setup::{SetupRequest, SetupStage, SetupTracker, TargetCalibration};
use crate::state::{GameStage, GameStateMachine, StageObserver};
use crate::stats::{PlayerStats, SessionSummary, ThrowMetrics};
use crate::trajectory::{ThrowCompletion, TrajectoryAccumulator};

/// Stages in which the body-pose detector runs.
const POSE_STAGES: [GameStage; 4] = [
    GameStage::DetectingPlayer,
    GameStage::DetectedPlayer,
    GameStage::TrackingThrows,
    GameStage::ThrowCompleted,
];

#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    config: GameConfig,
    view: ViewTransform,
    machine: GameStateMachine,
    setup: SetupTracker,
    calibration: Option<TargetCalibration>,
    player_box: Rect,
    regions: ThrowRegions,
    accumulator: TrajectoryAccumulator,
    stats: PlayerStats,
    last_metrics: Option<ThrowMetrics>,
    /// Poses buffered since the current throw left the hand.
    in_flight_poses: usize,
    classifier: ThrowClassifier,
    /// Bumped on every reset/stop; detections planned under an older epoch are dropped.
    epoch: u64,
}

impl GameSession {
    pub fn new(config: GameConfig, classifier: ThrowClassifier) -> Self {
        let view = ViewTransform::new(config.session.view_size);
        Self {
            id: Uuid::new_v4(),
            view,
            machine: GameStateMachine::new(),
            setup: SetupTracker::new(config.setup.clone(), view),
            calibration: None,
            player_box: Rect::EMPTY,
            regions: ThrowRegions::default(),
            accumulator: TrajectoryAccumulator::new(config.tracking.clone(), view),
            stats: PlayerStats::new(config.pose.history_capacity),
            last_metrics: None,
            in_flight_poses: 0,
            classifier,
            epoch: 0,
            config,
        }
    }

    // ========== Accessors ==========

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> GameStage {
        self.machine.current()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn setup_stage(&self) -> SetupStage {
        self.setup.stage()
    }

    pub fn calibration(&self) -> Option<&TargetCalibration> {
        self.calibration.as_ref()
    }

    pub fn player_box(&self) -> Rect {
        self.player_box
    }

    pub fn regions(&self) -> ThrowRegions {
        self.regions
    }

    pub fn accumulator(&self) -> &TrajectoryAccumulator {
        &self.accumulator
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn last_metrics(&self) -> Option<&ThrowMetrics> {
        self.last_metrics.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn summary(&self) -> SessionSummary {
        self.stats.summary(self.config.session.max_throws)
    }

    pub fn add_observer(&mut self, observer: Box<dyn StageObserver>) {
        self.machine.add_observer(observer);
    }

    // ========== Controls ==========

    /// Inactive → SetupCamera.
    pub fn start(&mut self) -> bool {
        self.transition(GameStage::SetupCamera)
    }

    /// Jump to the summary from TrackingThrows.
    pub fn request_summary(&mut self) -> bool {
        self.transition(GameStage::ShowSummary)
    }

    /// ShowSummary → DetectingPlayer for the next player.
    pub fn play_again(&mut self) -> bool {
        self.transition(GameStage::DetectingPlayer)
    }

    /// Clear all session state and return to Inactive. Observers stay registered.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.machine.enter(GameStage::Inactive);
        self.setup.reset();
        self.calibration = None;
        self.player_box = Rect::EMPTY;
        self.regions = ThrowRegions::default();
        self.accumulator.reset_for_tracking(ThrowRegions::default());
        self.stats = PlayerStats::new(self.config.pose.history_capacity);
        self.last_metrics = None;
        self.in_flight_poses = 0;
        info!(session = %self.id, "session reset");
    }

    /// Drop any throw in progress without leaving the current stage.
    pub fn cancel_in_flight(&mut self) {
        self.epoch += 1;
        self.accumulator.reset_path();
        self.stats.reset_observations();
        self.in_flight_poses = 0;
    }

    // ========== Frame pipeline ==========

    pub fn plan(&self) -> DetectionPlan {
        let stage = self.stage();
        let pose_budget_spent = self.accumulator.is_in_flight()
            && self.in_flight_poses >= self.config.pose.max_in_flight_observations;
        DetectionPlan {
            poses: POSE_STAGES.contains(&stage) && !pose_budget_spent,
            trajectories: stage == GameStage::TrackingThrows,
            setup: if stage == GameStage::DetectingTarget {
                self.setup.request()
            } else {
                SetupRequest::Idle
            },
        }
    }

    /// Fold one frame's detections into the session.
    ///
    /// Returns the metrics of a throw completed on this frame. Detector errors
    /// skip the affected step and never surface here.
    pub fn apply(&mut self, frame: &VideoFrame, detections: FrameDetections) -> Option<ThrowMetrics> {
        let span = info_span!("frame", session = %self.id, index = frame.index);
        let _guard = span.enter();

        match self.stage() {
            GameStage::SetupCamera => {
                self.transition(GameStage::DetectingTarget);
                None
            }
            GameStage::DetectingTarget => {
                self.apply_setup(frame, detections);
                None
            }
            stage if POSE_STAGES.contains(&stage) => {
                if let Some(poses) = accepted("pose", detections.poses) {
                    self.apply_poses(poses);
                }
                if !self.machine.is_in(GameStage::TrackingThrows) {
                    return None;
                }
                let batch = accepted("trajectory", detections.trajectories)?;
                self.apply_trajectories(&batch)
            }
            _ => None,
        }
    }

    fn apply_setup(&mut self, frame: &VideoFrame, detections: FrameDetections) {
        if let Some(targets) = accepted("target", detections.targets) {
            self.setup.on_targets(&targets);
        }
        if let Some(translation) = accepted("registration", detections.registration) {
            self.setup.on_registration(frame, translation);
        }
        let Some(contours) = accepted("contour", detections.contours) else {
            return;
        };
        if let Some(calibration) = self.setup.on_contours(&contours) {
            self.calibration = Some(calibration);
            self.update_regions();
            self.transition(GameStage::DetectedTarget);
        }
    }

    fn apply_poses(&mut self, poses: Vec<PoseObservation>) {
        let Some(pose) = poses.into_iter().next() else {
            return;
        };

        // the pose that finds the player is not part of any throw
        let tracking = self.machine.is_in(GameStage::TrackingThrows);
        let pose_config = &self.config.pose;
        let body = pose
            .bounding_box(pose_config.min_body_confidence, pose_config.min_joint_confidence)
            .map(|bb| self.view.rect_to_view(bb))
            .filter(|bb| !bb.is_empty());
        if let Some(body) = body {
            let inset = -pose_config.player_box_inset;
            self.player_box = body.inset(inset, inset);
            self.update_regions();
            if self.machine.is_in(GameStage::DetectingPlayer) {
                info!(player_box = ?self.player_box, "player detected");
                self.transition(GameStage::DetectedPlayer);
            }
        }

        if tracking {
            if self.accumulator.is_in_flight() {
                self.in_flight_poses += 1;
            }
            self.stats.store_observation(pose);
        }
    }

    fn apply_trajectories(&mut self, batch: &[TrajectoryObservation]) -> Option<ThrowMetrics> {
        let completion = self.accumulator.process_frame(batch)?;
        Some(self.complete_throw(completion))
    }

    fn complete_throw(&mut self, completion: ThrowCompletion) -> ThrowMetrics {
        let final_location = completion.final_view_location;
        self.stats.store_path(completion.path);

        let throw_type = self.classifier.classify(self.stats.pose_history());
        let score = ScoreEngine::score(final_location, throw_type);
        let speed = release_speed(
            completion.speed,
            self.calibration.map(|c| c.point_to_meter),
            &self.config.session,
        );
        let min_joint = self.config.pose.min_joint_confidence;
        let release_angle = self
            .stats
            .pose_history()
            .iter()
            .rev()
            .find_map(|pose| pose.arm_joints(min_joint))
            .map(|(elbow, wrist)| elbow.angle_from_horizontal(wrist));

        let metrics = ThrowMetrics {
            score,
            speed,
            throw_type,
            final_location,
            landed_in_target: self.regions.target_region.contains(final_location),
            release_angle,
        };
        info!(
            %throw_type,
            points = score.points(),
            speed,
            landed_in_target = metrics.landed_in_target,
            "throw scored"
        );
        self.last_metrics = Some(metrics.clone());
        self.transition(GameStage::ThrowCompleted);
        metrics
    }

    fn update_regions(&mut self) {
        let target = self.calibration.map(|c| c.target_region).unwrap_or(Rect::EMPTY);
        self.regions = ThrowRegions::compute(self.player_box, target, &self.config.regions);
    }

    // ========== Stage entry ==========

    /// Enter `target`, then follow whatever chained stages its entry action asks for.
    fn transition(&mut self, target: GameStage) -> bool {
        let mut next = Some(target);
        let mut entered = false;
        while let Some(stage) = next.take() {
            if !self.machine.enter(stage) {
                break;
            }
            entered = true;
            next = self.on_enter(stage);
        }
        entered
    }

    /// Entry action for `stage`; returns the stage to chain into, if any.
    fn on_enter(&mut self, stage: GameStage) -> Option<GameStage> {
        match stage {
            GameStage::SetupCamera => {
                self.setup.reset();
                None
            }
            GameStage::DetectedTarget => Some(GameStage::DetectingPlayer),
            GameStage::DetectedPlayer => {
                self.stats.reset();
                Some(GameStage::TrackingThrows)
            }
            GameStage::TrackingThrows => {
                self.accumulator.reset_for_tracking(self.regions);
                self.in_flight_poses = 0;
                None
            }
            GameStage::ThrowCompleted => {
                if let Some(metrics) = &self.last_metrics {
                    self.stats.adjust_metrics(metrics);
                }
                self.stats.reset_observations();
                self.in_flight_poses = 0;
                if self.stats.throw_count >= self.config.session.max_throws {
                    Some(GameStage::ShowSummary)
                } else {
                    Some(GameStage::TrackingThrows)
                }
            }
            GameStage::ShowSummary => {
                self.accumulator.reset_path();
                debug!(summary = ?self.summary(), "summary ready");
                None
            }
            GameStage::Inactive | GameStage::DetectingTarget | GameStage::DetectingPlayer => None,
        }
    }
}

/// Unwrap one detector's result; failures are logged and the step skipped.
fn accepted<T>(detector: &'static str, result: Option<Result<T, DetectionError>>) -> Option<T> {
    match result? {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(detector, error = %err, "detection failed, skipping frame");
            None
        }
    }
}
