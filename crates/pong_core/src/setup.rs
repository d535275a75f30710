//! Target calibration (DetectingTarget stage)
//!
//! Walks through five sub-stages, one detector per frame:
//!
//! | Sub-stage          | Detector           | Advances when                          |
//! |--------------------|--------------------|----------------------------------------|
//! | DetectingTarget    | target             | a confident target box is found        |
//! | DetectingPlacement | target             | the box sits inside the guide region   |
//! | DetectingStability | scene registration | >15 translations summing to < 10 units |
//! | DetectingContours  | contours           | table edge and hole are both found     |
//! | Complete           | none               |                                        |
//!
//! An unstable scene drops back to DetectingPlacement. A contour pass that finds
//! no usable edge or hole is retried on the next frame.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SetupConfig;
use crate::detection::{Contour, DetectedObject, Translation, VideoFrame};
use crate::geometry::{Point, Rect, ViewTransform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SetupStage {
    #[default]
    DetectingTarget,
    DetectingPlacement,
    DetectingStability,
    DetectingContours,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityResult {
    Unknown,
    Stable,
    Unstable,
}

/// Which detector the current sub-stage needs for the next frame.
#[derive(Debug, Clone, Default)]
pub enum SetupRequest {
    #[default]
    Idle,
    Targets,
    /// Register the incoming frame against `previous`. With no previous frame
    /// yet, the incoming one only seeds it.
    Registration { previous: Option<VideoFrame> },
    /// Contours inside the target box (normalized, y-up).
    Contours { region: Rect },
}

/// Physical calibration of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCalibration {
    /// Target box in view space.
    pub target_region: Rect,
    /// Hole (cup opening) in view space.
    pub hole_region: Rect,
    /// Meters per view unit.
    pub point_to_meter: f64,
}

/// Outcome of the contour pass, still in box-relative contour space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourAnalysis {
    pub edge: (Point, Point),
    /// Bounding box of the hole contour.
    pub hole: Rect,
}

/// Find the table edge and the hole among `contours`.
///
/// The outline is the polygon with the most points. Its edge is the segment
/// crossing x = 0.5 above `min_y` with the largest |dx| + |dy|, ignoring
/// segments that are not diagonal enough. The hole is any other polygon whose
/// bounding box starts at or beyond (0.5, 0.5).
pub fn analyze_contours(contours: &[Contour], config: &SetupConfig) -> Option<ContourAnalysis> {
    let polygons: Vec<(usize, &Contour)> =
        contours.iter().enumerate().filter(|(_, c)| c.points.len() >= 3).collect();
    let (outline_idx, outline) = polygons
        .iter()
        .copied()
        .reduce(|best, next| if next.1.points.len() > best.1.points.len() { next } else { best })?;

    let threshold = config.contour_diagonal_threshold;
    let mut edge = None;
    let mut largest = 0.0;
    for pair in outline.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let straddles = a.x.min(b.x) < 0.5 && a.x.max(b.x) > 0.5;
        if !straddles || a.y < config.contour_min_y || b.y < config.contour_min_y {
            continue;
        }
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        if dx <= threshold || dy <= threshold {
            continue;
        }
        if dx + dy > largest {
            largest = dx + dy;
            edge = Some((a, b));
        }
    }
    let edge = edge?;

    let hole = polygons
        .iter()
        .filter(|(idx, _)| *idx != outline_idx)
        .filter_map(|(_, c)| Rect::bounding(c.points.iter().copied()))
        .find(|bb| bb.min_x() >= 0.5 && bb.min_y() >= 0.5)?;

    Some(ContourAnalysis { edge, hole })
}

#[derive(Debug, Clone)]
pub struct SetupTracker {
    config: SetupConfig,
    view: ViewTransform,
    stage: SetupStage,
    /// Normalized target box from the last target detection.
    target_box: Option<Rect>,
    previous_frame: Option<VideoFrame>,
    translations: Vec<Translation>,
}

impl SetupTracker {
    pub fn new(config: SetupConfig, view: ViewTransform) -> Self {
        Self {
            config,
            view,
            stage: SetupStage::DetectingTarget,
            target_box: None,
            previous_frame: None,
            translations: Vec::new(),
        }
    }

    pub fn stage(&self) -> SetupStage {
        self.stage
    }

    pub fn target_box(&self) -> Option<Rect> {
        self.target_box
    }

    /// Guide region in view space.
    pub fn guide_region(&self) -> Rect {
        self.view.rect_to_view(self.config.guide_region)
    }

    pub fn reset(&mut self) {
        self.stage = SetupStage::DetectingTarget;
        self.target_box = None;
        self.clear_stability();
    }

    pub fn request(&self) -> SetupRequest {
        match self.stage {
            SetupStage::DetectingTarget | SetupStage::DetectingPlacement => SetupRequest::Targets,
            SetupStage::DetectingStability => {
                SetupRequest::Registration { previous: self.previous_frame.clone() }
            }
            SetupStage::DetectingContours => match self.target_box {
                Some(region) => SetupRequest::Contours { region },
                None => SetupRequest::Idle,
            },
            SetupStage::Complete => SetupRequest::Idle,
        }
    }

    /// Target detections for the current frame.
    pub fn on_targets(&mut self, detections: &[DetectedObject]) {
        if !matches!(self.stage, SetupStage::DetectingTarget | SetupStage::DetectingPlacement) {
            return;
        }
        let Some(target) =
            detections.iter().find(|d| d.confidence > self.config.min_target_confidence)
        else {
            self.target_box = None;
            self.stage = SetupStage::DetectingTarget;
            return;
        };

        self.target_box = Some(target.bounding_box);
        let placed = self.view.rect_to_view(target.bounding_box).is_inside(&self.guide_region());
        self.stage = if placed {
            debug!("target placed inside guide region");
            SetupStage::DetectingStability
        } else {
            SetupStage::DetectingPlacement
        };
    }

    /// Registration result for `frame` against the previous frame.
    ///
    /// The first frame of a stability run only becomes the reference.
    pub fn on_registration(&mut self, frame: &VideoFrame, translation: Option<Translation>) {
        if self.stage != SetupStage::DetectingStability {
            return;
        }
        let seeded = self.previous_frame.replace(frame.clone()).is_some();
        if !seeded {
            return;
        }
        if let Some(t) = translation {
            self.translations.push(t);
        }
        match self.stability() {
            StabilityResult::Unknown => {}
            StabilityResult::Stable => {
                info!(samples = self.translations.len(), "scene stable");
                self.stage = SetupStage::DetectingContours;
            }
            StabilityResult::Unstable => {
                debug!("scene unstable, back to placement");
                self.clear_stability();
                self.stage = SetupStage::DetectingPlacement;
            }
        }
    }

    pub fn stability(&self) -> StabilityResult {
        if self.translations.len() <= self.config.stability_history {
            return StabilityResult::Unknown;
        }
        let sum_x: f64 = self.translations.iter().map(|t| t.tx).sum();
        let sum_y: f64 = self.translations.iter().map(|t| t.ty).sum();
        if sum_x.abs() + sum_y.abs() < self.config.max_stability_drift {
            StabilityResult::Stable
        } else {
            StabilityResult::Unstable
        }
    }

    /// Contours found inside the target box. Returns the calibration once
    /// both the edge and the hole are usable.
    pub fn on_contours(&mut self, contours: &[Contour]) -> Option<TargetCalibration> {
        if self.stage != SetupStage::DetectingContours {
            return None;
        }
        let target_box = self.target_box?;
        let Some(analysis) = analyze_contours(contours, &self.config) else {
            debug!(contours = contours.len(), "no usable target contours");
            return None;
        };
        let calibration = self.calibrate(target_box, &analysis)?;
        info!(
            point_to_meter = calibration.point_to_meter,
            "target calibrated"
        );
        self.stage = SetupStage::Complete;
        Some(calibration)
    }

    fn calibrate(&self, target_box: Rect, analysis: &ContourAnalysis) -> Option<TargetCalibration> {
        let target_region = self.view.rect_to_view(target_box);

        let (a, b) = analysis.edge;
        let edge_width = (a.x - b.x).abs() * target_region.width();
        let edge_height = (a.y - b.y).abs() * target_region.height();
        let edge_length = edge_width.hypot(edge_height);
        if edge_length <= 0.0 {
            return None;
        }

        // contour space is y-down inside the box
        let hole = analysis.hole;
        let flipped_y = 1.0 - hole.min_y() - hole.height();
        let hole_normalized = Rect::new(
            target_box.min_x() + hole.min_x() * target_box.width(),
            target_box.min_y() + flipped_y * target_box.height(),
            hole.width() * target_box.width(),
            hole.height() * target_box.height(),
        );

        Some(TargetCalibration {
            target_region,
            hole_region: self.view.rect_to_view(hole_normalized),
            point_to_meter: self.config.table_length_m / edge_length,
        })
    }

    fn clear_stability(&mut self) {
        self.previous_frame = None;
        self.translations.clear();
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    fn tracker() -> SetupTracker {
        SetupTracker::new(SetupConfig::default(), ViewTransform::new(Size::new(1000.0, 1000.0)))
    }

    fn target(x: f64, y: f64, confidence: f32) -> DetectedObject {
        DetectedObject { bounding_box: Rect::new(x, y, 0.2, 0.2), confidence }
    }

    fn outline() -> Contour {
        Contour {
            points: vec![
                Point::new(0.1, 0.2),
                Point::new(0.3, 0.4),
                Point::new(0.7, 0.8),
                Point::new(0.9, 0.2),
            ],
        }
    }

    fn hole() -> Contour {
        Contour {
            points: vec![Point::new(0.6, 0.6), Point::new(0.8, 0.6), Point::new(0.8, 0.7)],
        }
    }

    fn stabilize(tracker: &mut SetupTracker, tx: f64) {
        for i in 0..17 {
            tracker.on_registration(&VideoFrame::new(i, i as f64 / 30.0), Some(Translation { tx, ty: 0.0 }));
        }
    }

    #[test]
    fn test_target_detection_and_placement() {
        let mut t = tracker();
        assert!(matches!(t.request(), SetupRequest::Targets));

        t.on_targets(&[target(0.75, 0.35, 0.6)]);
        assert_eq!(t.stage(), SetupStage::DetectingTarget);

        // confident but outside the guide
        t.on_targets(&[target(0.1, 0.1, 0.9)]);
        assert_eq!(t.stage(), SetupStage::DetectingPlacement);

        t.on_targets(&[]);
        assert_eq!(t.stage(), SetupStage::DetectingTarget);
        assert!(t.target_box().is_none());

        t.on_targets(&[target(0.75, 0.35, 0.9)]);
        assert_eq!(t.stage(), SetupStage::DetectingStability);
    }

    #[test]
    fn test_stability_needs_more_than_fifteen_samples() {
        let mut t = tracker();
        t.on_targets(&[target(0.75, 0.35, 0.9)]);

        // seed + 15 translations: still unknown
        for i in 0..16 {
            t.on_registration(&VideoFrame::new(i, 0.0), Some(Translation { tx: 0.1, ty: 0.1 }));
        }
        assert_eq!(t.stability(), StabilityResult::Unknown);
        assert_eq!(t.stage(), SetupStage::DetectingStability);

        t.on_registration(&VideoFrame::new(16, 0.0), Some(Translation { tx: 0.1, ty: 0.1 }));
        assert_eq!(t.stage(), SetupStage::DetectingContours);
        assert!(matches!(t.request(), SetupRequest::Contours { .. }));
    }

    #[test]
    fn test_unstable_scene_returns_to_placement() {
        let mut t = tracker();
        t.on_targets(&[target(0.75, 0.35, 0.9)]);
        stabilize(&mut t, 1.0);
        assert_eq!(t.stage(), SetupStage::DetectingPlacement);
        assert!(matches!(t.request(), SetupRequest::Targets));

        // history was cleared: next stability run starts from a fresh seed
        t.on_targets(&[target(0.75, 0.35, 0.9)]);
        assert!(matches!(t.request(), SetupRequest::Registration { previous: None }));
    }

    #[test]
    fn test_contour_analysis() {
        let config = SetupConfig::default();
        let analysis = analyze_contours(&[hole(), outline()], &config).unwrap();
        assert_eq!(analysis.edge, (Point::new(0.3, 0.4), Point::new(0.7, 0.8)));
        assert_eq!(analysis.hole, Rect::bounding(hole().points).unwrap());

        // no hole
        assert!(analyze_contours(&[outline()], &config).is_none());
        // degenerate polygons only
        let line = Contour { points: vec![Point::ZERO, Point::new(1.0, 1.0)] };
        assert!(analyze_contours(&[line], &config).is_none());
    }

    #[test]
    fn test_flat_segments_are_not_edges() {
        let flat = Contour {
            points: vec![
                Point::new(0.2, 0.5),
                Point::new(0.8, 0.51),
                Point::new(0.9, 0.9),
                Point::new(0.1, 0.9),
            ],
        };
        assert!(analyze_contours(&[flat, hole()], &SetupConfig::default()).is_none());
    }

    #[test]
    fn test_full_calibration() {
        let mut t = tracker();
        t.on_targets(&[DetectedObject { bounding_box: Rect::new(0.75, 0.35, 0.2, 0.2), confidence: 0.9 }]);
        stabilize(&mut t, 0.0);
        assert_eq!(t.stage(), SetupStage::DetectingContours);

        assert!(t.on_contours(&[outline()]).is_none());
        assert_eq!(t.stage(), SetupStage::DetectingContours);

        let calibration = t.on_contours(&[outline(), hole()]).unwrap();
        assert_eq!(t.stage(), SetupStage::Complete);

        // box 200×200 view units; edge spans 0.4×0.4 of it
        let edge = (80.0f64).hypot(80.0);
        assert!((calibration.point_to_meter - 1.22 / edge).abs() < 1e-12);

        let region = calibration.target_region;
        assert!((region.min_x() - 750.0).abs() < 1e-9);
        assert!((region.min_y() - 450.0).abs() < 1e-9);

        // hole (0.6, 0.6, 0.2, 0.1) in contour space → y flipped to 0.3 inside the box
        let hole = calibration.hole_region;
        assert!((hole.min_x() - 870.0).abs() < 1e-9);
        assert!((hole.width() - 40.0).abs() < 1e-9);
        assert!((hole.height() - 20.0).abs() < 1e-9);
        // normalized hole: y = 0.35 + 0.3 * 0.2 = 0.41, h = 0.02 → view top = (1 - 0.43) * 1000
        assert!((hole.min_y() - 570.0).abs() < 1e-9);
    }
}
