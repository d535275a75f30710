//! Per-frame detector selection and results
//!
//! The session decides which detectors a frame needs ([`DetectionPlan`]); the
//! runner executes them without holding the session lock and hands the
//! results back as [`FrameDetections`].

use crate::detection::{
    Contour, DetectedObject, Detectors, PoseObservation, TrajectoryObservation, Translation,
    VideoFrame,
};
use crate::error::DetectionError;
use crate::setup::SetupRequest;

#[derive(Debug, Clone, Default)]
pub struct DetectionPlan {
    pub poses: bool,
    pub trajectories: bool,
    pub setup: SetupRequest,
}

impl DetectionPlan {
    /// No detector needs to run for this frame.
    pub fn is_idle(&self) -> bool {
        !self.poses && !self.trajectories && matches!(self.setup, SetupRequest::Idle)
    }
}

/// Detector output for one frame. `None` means the detector was not run.
#[derive(Debug, Default)]
pub struct FrameDetections {
    pub poses: Option<Result<Vec<PoseObservation>, DetectionError>>,
    pub trajectories: Option<Result<Vec<TrajectoryObservation>, DetectionError>>,
    pub targets: Option<Result<Vec<DetectedObject>, DetectionError>>,
    pub registration: Option<Result<Option<Translation>, DetectionError>>,
    pub contours: Option<Result<Vec<Contour>, DetectionError>>,
}

impl FrameDetections {
    /// Run every detector `plan` asks for. Pose and trajectory detection run
    /// in parallel with the setup detector.
    pub fn run(plan: &DetectionPlan, frame: &VideoFrame, detectors: &Detectors) -> Self {
        let ((poses, trajectories), mut detections) = rayon::join(
            || {
                rayon::join(
                    || plan.poses.then(|| detectors.pose.detect_poses(frame)),
                    || plan.trajectories.then(|| detectors.trajectory.detect_trajectories(frame)),
                )
            },
            || Self::run_setup(&plan.setup, frame, detectors),
        );
        detections.poses = poses;
        detections.trajectories = trajectories;
        detections
    }

    fn run_setup(request: &SetupRequest, frame: &VideoFrame, detectors: &Detectors) -> Self {
        let mut detections = Self::default();
        match request {
            SetupRequest::Idle => {}
            SetupRequest::Targets => {
                detections.targets = Some(detectors.target.detect_targets(frame));
            }
            SetupRequest::Registration { previous } => {
                // first frame of a stability run has nothing to register against
                detections.registration = Some(match previous {
                    Some(previous) => detectors.registration.register(previous, frame),
                    None => Ok(None),
                });
            }
            SetupRequest::Contours { region } => {
                detections.contours = Some(detectors.contours.detect_contours(frame, *region));
            }
        }
        detections
    }
}
