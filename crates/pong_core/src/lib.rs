//! # pong_core - Throw Tracking and Scoring Pipeline
//!
//! Turns a stream of per-frame detector output into a cup-pong game: target
//! calibration, player detection, throw tracking, throw classification,
//! scoring and per-session statistics.
//!
//! ## Features
//! - Explicit stage machine with a static transition table
//! - Noise-tolerant online trajectory accumulation
//! - Detector and classifier capabilities injected as traits
//! - Frame runner with serialized session state and parallel detection

pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod pose;
pub mod regions;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod setup;
pub mod state;
pub mod stats;
pub mod trajectory;

pub use error::{PongError, Result};

// Re-export the session surface
pub use session::{DetectionPlan, FrameDetections, GameSession};
pub use state::{GameStage, GameStateMachine, StageChange, StageObserver};
pub use stats::{PlayerStats, SessionSummary, ThrowMetrics};

// Re-export pipeline types
pub use classifier::{ActionClassifier, ThrowClassifier, ThrowType};
pub use config::GameConfig;
pub use detection::{Detectors, VideoFrame};
pub use geometry::{Point, Rect, Size, ViewTransform};
pub use runtime::{GameEvent, GameRunner};
pub use scoring::{ScoreEngine, Scoring};
pub use setup::TargetCalibration;
pub use trajectory::{ThrowCompletion, TrajectoryAccumulator};
