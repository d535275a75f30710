//! Frame runner
//!
//! A dedicated worker thread takes frames off a channel, asks the session what
//! to detect, runs the detectors without holding the session lock, then applies
//! the results. A reset between planning and applying bumps the session epoch
//! and the stale results are dropped.
//!
//! UI-facing output goes through a [`GameEvent`] channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detection::{Detectors, VideoFrame};
use crate::error::RunnerError;
use crate::session::{FrameDetections, GameSession};
use crate::state::StageChange;
use crate::stats::{SessionSummary, ThrowMetrics};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    StageEntered(StageChange),
    ThrowCompleted { metrics: ThrowMetrics, summary: SessionSummary },
}

enum Command {
    Frame(VideoFrame),
    Stop,
}

pub struct GameRunner {
    session: Arc<Mutex<GameSession>>,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl GameRunner {
    /// Spawn the worker. Stage changes and completed throws arrive on the
    /// returned receiver.
    pub fn start(
        mut session: GameSession,
        detectors: Detectors,
    ) -> crate::Result<(Self, Receiver<GameEvent>)> {
        let (events, event_rx) = mpsc::channel();
        let stage_events = events.clone();
        session.add_observer(Box::new(move |change: StageChange| {
            // receiver gone means nobody is listening any more
            let _ = stage_events.send(GameEvent::StageEntered(change));
        }));

        let session = Arc::new(Mutex::new(session));
        let (commands, command_rx) = mpsc::channel();
        let worker_session = Arc::clone(&session);
        let worker = thread::Builder::new()
            .name("pong-frames".into())
            .spawn(move || frame_loop(worker_session, detectors, command_rx, events))
            .map_err(RunnerError::Spawn)?;

        info!("frame runner started");
        Ok((Self { session, commands: Some(commands), worker: Some(worker) }, event_rx))
    }

    /// Queue a frame for processing.
    pub fn submit(&self, frame: VideoFrame) -> Result<(), RunnerError> {
        let commands = self.commands.as_ref().ok_or(RunnerError::Stopped)?;
        commands.send(Command::Frame(frame)).map_err(|_| RunnerError::Stopped)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn session(&self) -> Arc<Mutex<GameSession>> {
        Arc::clone(&self.session)
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    pub fn start_game(&self) -> bool {
        self.with_session(GameSession::start)
    }

    pub fn request_summary(&self) -> bool {
        self.with_session(GameSession::request_summary)
    }

    pub fn play_again(&self) -> bool {
        self.with_session(GameSession::play_again)
    }

    /// Reset the session. Frames already in the detectors are discarded.
    pub fn reset(&self) {
        self.with_session(GameSession::reset);
    }

    /// Finish queued frames, join the worker and drop any throw in progress.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Stop);
        }
        if worker.join().is_err() {
            warn!("frame worker panicked");
        }
        lock(&self.session).cancel_in_flight();
        info!("frame runner stopped");
    }
}

impl Drop for GameRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(session: &Mutex<GameSession>) -> MutexGuard<'_, GameSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn frame_loop(
    session: Arc<Mutex<GameSession>>,
    detectors: Detectors,
    commands: Receiver<Command>,
    events: Sender<GameEvent>,
) {
    for command in commands {
        match command {
            Command::Frame(frame) => process_frame(&session, &detectors, &frame, &events),
            Command::Stop => break,
        }
    }
    debug!("frame loop exited");
}

fn process_frame(
    session: &Mutex<GameSession>,
    detectors: &Detectors,
    frame: &VideoFrame,
    events: &Sender<GameEvent>,
) {
    let (plan, epoch) = {
        let session = lock(session);
        (session.plan(), session.epoch())
    };

    let detections = if plan.is_idle() {
        FrameDetections::default()
    } else {
        FrameDetections::run(&plan, frame, detectors)
    };

    let mut session = lock(session);
    if session.epoch() != epoch {
        debug!(index = frame.index, "session reset during detection, dropping results");
        return;
    }
    if let Some(metrics) = session.apply(frame, detections) {
        let summary = session.summary();
        drop(session);
        let _ = events.send(GameEvent::ThrowCompleted { metrics, summary });
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FixedLabelClassifier, ThrowClassifier};
    use crate::config::GameConfig;
    use crate::detection::{
        Contour, ContourDetector, DetectedObject, PoseDetector, PoseObservation,
        SceneRegistration, TargetDetector, TrajectoryDetector, TrajectoryObservation,
        Translation,
    };
    use crate::error::DetectionError;
    use crate::geometry::Rect;
    use crate::state::GameStage;

    struct NoPoses;
    impl PoseDetector for NoPoses {
        fn detect_poses(&self, _: &VideoFrame) -> Result<Vec<PoseObservation>, DetectionError> {
            Ok(vec![])
        }
    }

    struct NoTrajectories;
    impl TrajectoryDetector for NoTrajectories {
        fn detect_trajectories(
            &self,
            _: &VideoFrame,
        ) -> Result<Vec<TrajectoryObservation>, DetectionError> {
            Ok(vec![])
        }
    }

    /// Reports a target from frame 2 on.
    struct LateTarget;
    impl TargetDetector for LateTarget {
        fn detect_targets(&self, frame: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
            if frame.index < 2 {
                return Ok(vec![]);
            }
            Ok(vec![DetectedObject {
                bounding_box: Rect::new(0.75, 0.35, 0.2, 0.2),
                confidence: 0.9,
            }])
        }
    }

    struct Still;
    impl SceneRegistration for Still {
        fn register(
            &self,
            _: &VideoFrame,
            _: &VideoFrame,
        ) -> Result<Option<Translation>, DetectionError> {
            Ok(Some(Translation::default()))
        }
    }

    struct Broken;
    impl ContourDetector for Broken {
        fn detect_contours(&self, _: &VideoFrame, _: Rect) -> Result<Vec<Contour>, DetectionError> {
            Err(DetectionError::Unavailable { detector: "contour" })
        }
    }

    /// Reports a target, but only once the test lets it through.
    struct GatedTarget {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }
    impl TargetDetector for GatedTarget {
        fn detect_targets(&self, _: &VideoFrame) -> Result<Vec<DetectedObject>, DetectionError> {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            Ok(vec![DetectedObject {
                bounding_box: Rect::new(0.75, 0.35, 0.2, 0.2),
                confidence: 0.9,
            }])
        }
    }

    fn runner_with_target(target: Box<dyn TargetDetector>) -> (GameRunner, Receiver<GameEvent>) {
        let session = GameSession::new(
            GameConfig::default().with_view_size(1000.0, 1000.0),
            ThrowClassifier::new(Box::new(FixedLabelClassifier::new("overhand"))),
        );
        let detectors = Detectors {
            pose: Box::new(NoPoses),
            trajectory: Box::new(NoTrajectories),
            target,
            registration: Box::new(Still),
            contours: Box::new(Broken),
        };
        GameRunner::start(session, detectors).unwrap()
    }

    fn runner() -> (GameRunner, Receiver<GameEvent>) {
        runner_with_target(Box::new(LateTarget))
    }

    #[test]
    fn test_frames_drive_setup() {
        let (mut runner, events) = runner();
        assert!(runner.start_game());
        for i in 0..30 {
            runner.submit(VideoFrame::new(i, i as f64 / 30.0)).unwrap();
        }
        runner.stop();

        // contour detector always fails: setup stalls in contour detection
        runner.with_session(|s| {
            assert_eq!(s.stage(), GameStage::DetectingTarget);
            assert_eq!(s.setup_stage(), crate::setup::SetupStage::DetectingContours);
        });

        let stages: Vec<GameStage> = events
            .try_iter()
            .filter_map(|e| match e {
                GameEvent::StageEntered(change) => Some(change.new),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![GameStage::SetupCamera, GameStage::DetectingTarget]);
    }

    #[test]
    fn test_submit_after_stop_fails() {
        let (mut runner, _events) = runner();
        runner.stop();
        assert!(!runner.is_running());
        assert!(matches!(runner.submit(VideoFrame::new(0, 0.0)), Err(RunnerError::Stopped)));
        // stopping twice is harmless
        runner.stop();
    }

    #[test]
    fn test_reset_returns_to_inactive() {
        let (runner, events) = runner();
        runner.start_game();
        runner.reset();
        runner.with_session(|s| {
            assert_eq!(s.stage(), GameStage::Inactive);
            assert_eq!(s.epoch(), 1);
        });
        let last = events.try_iter().last();
        assert!(matches!(
            last,
            Some(GameEvent::StageEntered(StageChange { new: GameStage::Inactive, .. }))
        ));
    }

    #[test]
    fn test_results_from_before_reset_are_dropped() {
        let (entered_tx, entered) = mpsc::channel();
        let (release, release_rx) = mpsc::channel();
        let (mut runner, _events) = runner_with_target(Box::new(GatedTarget {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));

        runner.start_game();
        runner.submit(VideoFrame::new(0, 0.0)).unwrap();
        runner.submit(VideoFrame::new(1, 1.0 / 30.0)).unwrap();

        // target detection for frame 1 is running outside the session lock
        entered.recv().unwrap();
        runner.reset();
        assert!(runner.start_game());
        release.send(()).unwrap();
        runner.stop();

        runner.with_session(|s| {
            assert_eq!(s.stage(), GameStage::SetupCamera);
            assert_eq!(s.setup_stage(), crate::setup::SetupStage::DetectingTarget);
        });
    }
}
