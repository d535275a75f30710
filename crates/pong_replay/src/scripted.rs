//! Detectors and classifier that serve recorded results

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pong_core::classifier::{ActionClassifier, ActionPrediction, PoseWindow};
use pong_core::detection::{
    Contour, ContourDetector, DetectedObject, Detectors, PoseDetector, PoseObservation,
    SceneRegistration, TargetDetector, TrajectoryDetector, TrajectoryObservation, Translation,
    VideoFrame,
};
use pong_core::error::{ClassificationError, DetectionError};
use pong_core::geometry::Rect;

use crate::log::{RecordedFrame, ReplayLog};

type FrameTable = Arc<BTreeMap<u64, RecordedFrame>>;

/// One recorded frame per index; shared by every scripted detector.
#[derive(Debug, Clone)]
pub struct ScriptedDetector {
    frames: FrameTable,
}

impl ScriptedDetector {
    pub fn new(log: &ReplayLog) -> Self {
        let frames = log.frames.iter().map(|f| (f.index, f.clone())).collect();
        Self { frames: Arc::new(frames) }
    }

    /// The full detector set, each serving its slice of the recording.
    pub fn detectors(&self) -> Detectors {
        Detectors {
            pose: Box::new(self.clone()),
            trajectory: Box::new(self.clone()),
            target: Box::new(self.clone()),
            registration: Box::new(self.clone()),
            contours: Box::new(self.clone()),
        }
    }

    fn recorded<T>(
        &self,
        frame: &VideoFrame,
        detector: &'static str,
        pick: impl FnOnce(&RecordedFrame) -> T,
    ) -> Result<T, DetectionError>
    where
        T: Default,
    {
        let Some(recorded) = self.frames.get(&frame.index) else {
            return Ok(T::default());
        };
        if recorded.failed.iter().any(|name| name == detector) {
            return Err(DetectionError::failed(detector, "recorded failure"));
        }
        Ok(pick(recorded))
    }
}

impl PoseDetector for ScriptedDetector {
    fn detect_poses(&self, frame: &VideoFrame) -> Result<Vec<PoseObservation>, DetectionError> {
        self.recorded(frame, "pose", |f| f.poses.clone())
    }
}

impl TrajectoryDetector for ScriptedDetector {
    fn detect_trajectories(
        &self,
        frame: &VideoFrame,
    ) -> Result<Vec<TrajectoryObservation>, DetectionError> {
        self.recorded(frame, "trajectory", |f| f.trajectories.clone())
    }
}

impl TargetDetector for ScriptedDetector {
    fn detect_targets(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
        self.recorded(frame, "target", |f| f.targets.clone())
    }
}

impl SceneRegistration for ScriptedDetector {
    fn register(
        &self,
        _previous: &VideoFrame,
        current: &VideoFrame,
    ) -> Result<Option<Translation>, DetectionError> {
        self.recorded(current, "registration", |f| f.translation)
    }
}

impl ContourDetector for ScriptedDetector {
    fn detect_contours(
        &self,
        frame: &VideoFrame,
        _region: Rect,
    ) -> Result<Vec<Contour>, DetectionError> {
        self.recorded(frame, "contour", |f| f.contours.clone())
    }
}

/// Hands out recorded labels in throw order; `"none"` once they run out.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    labels: Vec<String>,
    next: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels, next: AtomicUsize::new(0) }
    }
}

impl ActionClassifier for ScriptedClassifier {
    fn predict(&self, _window: &PoseWindow) -> Result<ActionPrediction, ClassificationError> {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        let label = self.labels.get(i).cloned().unwrap_or_else(|| "none".to_string());
        Ok(ActionPrediction { label, confidence: 1.0 })
    }
}
