//! Detector boundary
//!
//! Model inference (body pose, trajectories, object boxes, contours, frame
//! registration) happens outside this crate. This module defines what goes in
//! (a [`VideoFrame`]) and what comes out (confidence-scored observations), plus
//! the detector traits the runner calls.
//!
//! All locations coming out of a detector are normalized (0..1, y-up).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::DetectionError;
use crate::geometry::{Point, Rect};

// ========================
// Frames
// ========================

/// Capture orientation reported with each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

/// Opaque pixel data; only detectors look inside.
#[derive(Debug, Clone, Default)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    pub index: u64,
    /// Capture time in seconds.
    pub timestamp: f64,
    pub orientation: Orientation,
    pub pixels: PixelBuffer,
}

impl VideoFrame {
    pub fn new(index: u64, timestamp: f64) -> Self {
        Self { index, timestamp, ..Default::default() }
    }
}

// ========================
// Body pose
// ========================

/// Joints reported by the pose detector. The first 18 follow the classifier's
/// keypoint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    Neck,
    RightShoulder,
    RightElbow,
    RightWrist,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    RightHip,
    RightKnee,
    RightAnkle,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    RightEye,
    LeftEye,
    RightEar,
    LeftEar,
    Root,
}

/// Number of joints fed to the classifier per frame.
pub const KEYPOINT_COUNT: usize = 18;

/// Classifier keypoint order.
pub const KEYPOINT_ORDER: [JointName; KEYPOINT_COUNT] = [
    JointName::Nose,
    JointName::Neck,
    JointName::RightShoulder,
    JointName::RightElbow,
    JointName::RightWrist,
    JointName::LeftShoulder,
    JointName::LeftElbow,
    JointName::LeftWrist,
    JointName::RightHip,
    JointName::RightKnee,
    JointName::RightAnkle,
    JointName::LeftHip,
    JointName::LeftKnee,
    JointName::LeftAnkle,
    JointName::RightEye,
    JointName::LeftEye,
    JointName::RightEar,
    JointName::LeftEar,
];

/// Joints drawn as the throwing-arm overlay.
pub const JOINTS_OF_INTEREST: [JointName; 4] =
    [JointName::RightWrist, JointName::RightElbow, JointName::RightShoulder, JointName::RightHip];

/// Per-frame classifier input: rows are x, y, confidence; columns follow [`KEYPOINT_ORDER`].
pub type KeypointFrame = [[f32; KEYPOINT_COUNT]; 3];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPoint {
    pub location: Point,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseObservation {
    /// Whole-body confidence.
    pub confidence: f32,
    #[serde(default)]
    pub timestamp: f64,
    pub joints: BTreeMap<JointName, RecognizedPoint>,
}

impl PoseObservation {
    pub fn joint(&self, name: JointName, min_confidence: f32) -> Option<Point> {
        self.joints.get(&name).filter(|p| p.confidence > min_confidence).map(|p| p.location)
    }

    /// Throwing-arm joints above `min_confidence`.
    pub fn joints_of_interest(&self, min_confidence: f32) -> BTreeMap<JointName, Point> {
        JOINTS_OF_INTEREST
            .iter()
            .filter_map(|&name| self.joint(name, min_confidence).map(|p| (name, p)))
            .collect()
    }

    /// Right elbow and wrist, when both are confident enough.
    pub fn arm_joints(&self, min_confidence: f32) -> Option<(Point, Point)> {
        let elbow = self.joint(JointName::RightElbow, min_confidence)?;
        let wrist = self.joint(JointName::RightWrist, min_confidence)?;
        Some((elbow, wrist))
    }

    /// Normalized bounding box of all confident joints.
    ///
    /// `None` if the observation itself is not confident enough or no joint
    /// passes `min_joint_confidence`.
    pub fn bounding_box(&self, min_body_confidence: f32, min_joint_confidence: f32) -> Option<Rect> {
        if self.confidence <= min_body_confidence {
            return None;
        }
        Rect::bounding(
            self.joints
                .values()
                .filter(|p| p.confidence > min_joint_confidence)
                .map(|p| p.location),
        )
    }

    pub fn keypoints(&self) -> KeypointFrame {
        let mut frame = [[0.0f32; KEYPOINT_COUNT]; 3];
        for (col, name) in KEYPOINT_ORDER.iter().enumerate() {
            if let Some(p) = self.joints.get(name) {
                frame[0][col] = p.location.x as f32;
                frame[1][col] = p.location.y as f32;
                frame[2][col] = p.confidence;
            }
        }
        frame
    }
}

// ========================
// Trajectories
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointObservation {
    pub location: Point,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub timestamp: f64,
}

fn full_confidence() -> f32 {
    1.0
}

impl PointObservation {
    pub fn new(x: f64, y: f64) -> Self {
        Self { location: Point::new(x, y), confidence: 1.0, timestamp: 0.0 }
    }
}

/// One detected trajectory set: ordered points plus an aggregate confidence and
/// the time span (seconds) the points cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryObservation {
    pub points: Vec<PointObservation>,
    pub confidence: f32,
    pub duration: f64,
}

impl TrajectoryObservation {
    /// The object must travel rightward across the frame.
    pub fn is_moving_forward(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.location.x > first.location.x,
            _ => false,
        }
    }
}

// ========================
// Target calibration inputs
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Normalized, y-up.
    pub bounding_box: Rect,
    pub confidence: f32,
}

/// Translation between two consecutive frames (view units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation {
    pub tx: f64,
    pub ty: f64,
}

/// Polygon-approximated contour, normalized to the region it was detected in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point>,
}

// ========================
// Detector traits
// ========================

pub trait PoseDetector: Send + Sync {
    fn detect_poses(&self, frame: &VideoFrame) -> Result<Vec<PoseObservation>, DetectionError>;
}

pub trait TrajectoryDetector: Send + Sync {
    fn detect_trajectories(
        &self,
        frame: &VideoFrame,
    ) -> Result<Vec<TrajectoryObservation>, DetectionError>;
}

pub trait TargetDetector: Send + Sync {
    fn detect_targets(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError>;
}

pub trait SceneRegistration: Send + Sync {
    /// `Ok(None)` when the frames could not be aligned.
    fn register(
        &self,
        previous: &VideoFrame,
        current: &VideoFrame,
    ) -> Result<Option<Translation>, DetectionError>;
}

pub trait ContourDetector: Send + Sync {
    /// Top-level contours inside `region` (normalized, y-up).
    fn detect_contours(
        &self,
        frame: &VideoFrame,
        region: Rect,
    ) -> Result<Vec<Contour>, DetectionError>;
}

/// The full detector set handed to the runner.
pub struct Detectors {
    pub pose: Box<dyn PoseDetector>,
    pub trajectory: Box<dyn TrajectoryDetector>,
    pub target: Box<dyn TargetDetector>,
    pub registration: Box<dyn SceneRegistration>,
    pub contours: Box<dyn ContourDetector>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(x: f64, y: f64, confidence: f32) -> RecognizedPoint {
        RecognizedPoint { location: Point::new(x, y), confidence }
    }

    fn sample_pose() -> PoseObservation {
        let mut joints = BTreeMap::new();
        joints.insert(JointName::RightWrist, joint(0.4, 0.6, 0.9));
        joints.insert(JointName::RightElbow, joint(0.35, 0.55, 0.8));
        joints.insert(JointName::RightShoulder, joint(0.3, 0.7, 0.05));
        joints.insert(JointName::LeftAnkle, joint(0.2, 0.1, 0.7));
        PoseObservation { confidence: 0.8, timestamp: 0.0, joints }
    }

    #[test]
    fn test_bounding_box_skips_low_confidence_joints() {
        let pose = sample_pose();
        let bb = pose.bounding_box(0.6, 0.1).unwrap();
        assert!((bb.min_x() - 0.2).abs() < 1e-9);
        assert!((bb.min_y() - 0.1).abs() < 1e-9);
        assert!((bb.max_x() - 0.4).abs() < 1e-9);
        assert!((bb.max_y() - 0.6).abs() < 1e-9);

        let mut weak = pose.clone();
        weak.confidence = 0.5;
        assert!(weak.bounding_box(0.6, 0.1).is_none());
    }

    #[test]
    fn test_joints_of_interest_and_arm() {
        let pose = sample_pose();
        let joints = pose.joints_of_interest(0.1);
        assert_eq!(joints.len(), 2);
        assert!(joints.contains_key(&JointName::RightWrist));
        assert!(!joints.contains_key(&JointName::RightShoulder));

        let (elbow, wrist) = pose.arm_joints(0.1).unwrap();
        assert_eq!(elbow, Point::new(0.35, 0.55));
        assert_eq!(wrist, Point::new(0.4, 0.6));
    }

    #[test]
    fn test_keypoints_layout() {
        let kp = sample_pose().keypoints();
        let wrist_col = KEYPOINT_ORDER.iter().position(|j| *j == JointName::RightWrist).unwrap();
        assert!((kp[0][wrist_col] - 0.4).abs() < 1e-6);
        assert!((kp[1][wrist_col] - 0.6).abs() < 1e-6);
        assert!((kp[2][wrist_col] - 0.9).abs() < 1e-6);
        // nose missing
        assert_eq!(kp[2][0], 0.0);
    }

    #[test]
    fn test_moving_forward() {
        let forward = TrajectoryObservation {
            points: vec![PointObservation::new(0.1, 0.5), PointObservation::new(0.2, 0.6)],
            confidence: 0.95,
            duration: 0.1,
        };
        assert!(forward.is_moving_forward());

        let backward = TrajectoryObservation {
            points: vec![PointObservation::new(0.2, 0.5), PointObservation::new(0.2, 0.6)],
            ..forward.clone()
        };
        assert!(!backward.is_moving_forward());

        let empty = TrajectoryObservation { points: vec![], ..forward };
        assert!(!empty.is_moving_forward());
    }
}
