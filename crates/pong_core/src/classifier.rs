//! Throw classification from buffered pose history
//!
//! Model inference is external ([`ActionClassifier`]). This module builds the
//! fixed-length window the model expects and maps its label onto [`ThrowType`].
//!
//! Window layout: `window_len` frames × [`KeypointFrame`] (3 × 18), oldest
//! first. Missing frames are zero-filled at the end.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::detection::{KeypointFrame, KEYPOINT_COUNT};
use crate::error::ClassificationError;
use crate::pose::{PoseHistoryBuffer, POSE_HISTORY_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThrowType {
    Overhand,
    Trick,
    #[default]
    None,
}

impl ThrowType {
    pub const ALL: [ThrowType; 3] = [ThrowType::Overhand, ThrowType::Trick, ThrowType::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThrowType::Overhand => "Overhand",
            ThrowType::Trick => "Trick",
            ThrowType::None => "None",
        }
    }

    /// Case-insensitive label lookup (`"overhand"`, `"TRICK"`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for ThrowType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-length classifier input.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseWindow {
    frames: Vec<KeypointFrame>,
}

impl PoseWindow {
    pub fn from_history(history: &PoseHistoryBuffer, window_len: usize) -> Self {
        let mut frames: Vec<KeypointFrame> =
            history.iter().take(window_len).map(|pose| pose.keypoints()).collect();
        frames.resize(window_len, [[0.0; KEYPOINT_COUNT]; 3]);
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[KeypointFrame] {
        &self.frames
    }

    /// Row-major `[frame][row][joint]` as a flat array.
    pub fn as_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames.len() * 3 * KEYPOINT_COUNT);
        for frame in &self.frames {
            for row in frame {
                out.extend_from_slice(row);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPrediction {
    pub label: String,
    pub confidence: f32,
}

/// External action-classification capability.
pub trait ActionClassifier: Send + Sync {
    fn predict(&self, window: &PoseWindow) -> Result<ActionPrediction, ClassificationError>;
}

pub struct ThrowClassifier {
    model: Box<dyn ActionClassifier>,
    window_len: usize,
}

impl fmt::Debug for ThrowClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrowClassifier").field("window_len", &self.window_len).finish()
    }
}

impl ThrowClassifier {
    pub fn new(model: Box<dyn ActionClassifier>) -> Self {
        Self::with_window(model, POSE_HISTORY_CAPACITY)
    }

    pub fn with_window(model: Box<dyn ActionClassifier>, window_len: usize) -> Self {
        Self { model, window_len }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Never fails: any model error or unmapped label yields [`ThrowType::None`].
    pub fn classify(&self, history: &PoseHistoryBuffer) -> ThrowType {
        let window = PoseWindow::from_history(history, self.window_len);
        match self.try_classify(&window) {
            Ok(throw_type) => throw_type,
            Err(err) => {
                warn!(error = %err, buffered = history.len(), "throw classification failed");
                ThrowType::None
            }
        }
    }

    fn try_classify(&self, window: &PoseWindow) -> Result<ThrowType, ClassificationError> {
        let prediction = self.model.predict(window)?;
        let throw_type = ThrowType::from_label(&prediction.label)
            .ok_or_else(|| ClassificationError::UnknownLabel(prediction.label.clone()))?;
        debug!(label = %prediction.label, confidence = prediction.confidence, %throw_type, "throw classified");
        Ok(throw_type)
    }
}

/// Classifier that always reports the same label; used when no model is loaded.
#[derive(Debug, Clone)]
pub struct FixedLabelClassifier {
    pub label: String,
}

impl FixedLabelClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ActionClassifier for FixedLabelClassifier {
    fn predict(&self, _window: &PoseWindow) -> Result<ActionPrediction, ClassificationError> {
        Ok(ActionPrediction { label: self.label.clone(), confidence: 1.0 })
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{JointName, PoseObservation, RecognizedPoint};
    use crate::geometry::Point;
    use std::sync::{Arc, Mutex};

    struct FailingModel;

    impl ActionClassifier for FailingModel {
        fn predict(&self, _window: &PoseWindow) -> Result<ActionPrediction, ClassificationError> {
            Err(ClassificationError::Model("model not loaded".into()))
        }
    }

    /// Records the window length it was called with.
    struct RecordingModel {
        seen: Arc<Mutex<Vec<usize>>>,
        label: &'static str,
    }

    impl ActionClassifier for RecordingModel {
        fn predict(&self, window: &PoseWindow) -> Result<ActionPrediction, ClassificationError> {
            self.seen.lock().unwrap().push(window.len());
            Ok(ActionPrediction { label: self.label.into(), confidence: 0.7 })
        }
    }

    fn pose_with_wrist_x(x: f64) -> PoseObservation {
        let mut pose = PoseObservation { confidence: 0.9, ..Default::default() };
        pose.joints.insert(
            JointName::RightWrist,
            RecognizedPoint { location: Point::new(x, 0.5), confidence: 0.8 },
        );
        pose
    }

    #[test]
    fn test_label_mapping_is_case_insensitive() {
        assert_eq!(ThrowType::from_label("overhand"), Some(ThrowType::Overhand));
        assert_eq!(ThrowType::from_label("TRICK"), Some(ThrowType::Trick));
        assert_eq!(ThrowType::from_label(" none "), Some(ThrowType::None));
        assert_eq!(ThrowType::from_label("underhand"), None);
    }

    #[test]
    fn test_window_is_padded_to_fixed_length() {
        let mut history = PoseHistoryBuffer::new();
        for i in 0..12 {
            history.store(pose_with_wrist_x(i as f64 / 100.0));
        }
        let window = PoseWindow::from_history(&history, 90);
        assert_eq!(window.len(), 90);

        // chronological, then zero padding
        let wrist = 4;
        assert!((window.frames()[0][0][wrist] - 0.0).abs() < 1e-6);
        assert!((window.frames()[11][0][wrist] - 0.11).abs() < 1e-6);
        assert!(window.frames()[12..].iter().all(|f| f.iter().flatten().all(|v| *v == 0.0)));
        assert_eq!(window.as_flat().len(), 90 * 3 * 18);
    }

    #[test]
    fn test_empty_history_still_produces_full_window() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let classifier = ThrowClassifier::new(Box::new(RecordingModel {
            seen: Arc::clone(&seen),
            label: "overhand",
        }));
        assert_eq!(classifier.classify(&PoseHistoryBuffer::new()), ThrowType::Overhand);
        assert_eq!(*seen.lock().unwrap(), vec![90]);
    }

    #[test]
    fn test_failures_degrade_to_none() {
        let history = PoseHistoryBuffer::new();
        let failing = ThrowClassifier::new(Box::new(FailingModel));
        assert_eq!(failing.classify(&history), ThrowType::None);

        let unknown = ThrowClassifier::new(Box::new(FixedLabelClassifier::new("sidearm")));
        assert_eq!(unknown.classify(&history), ThrowType::None);

        let trick = ThrowClassifier::new(Box::new(FixedLabelClassifier::new("trick")));
        assert_eq!(trick.classify(&history), ThrowType::Trick);
    }
}
