//! Replay Library
//!
//! Recorded detection log → scripted detectors → frame runner → session report

pub mod log;
pub mod scripted;

pub use log::{RecordedFrame, ReplayLog};
pub use scripted::{ScriptedClassifier, ScriptedDetector};

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use pong_core::{
    GameConfig, GameEvent, GameRunner, GameSession, GameStage, SessionSummary, StageChange,
    ThrowClassifier, ThrowMetrics, VideoFrame,
};

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub session_id: String,
    /// RFC3339
    pub generated_at: String,
    pub frames: usize,
    pub final_stage: GameStage,
    pub stages: Vec<StageChange>,
    pub throws: Vec<ThrowMetrics>,
    pub summary: SessionSummary,
}

/// Run `log` through a fresh session. `on_event` sees every event in order.
pub fn replay(
    log: &ReplayLog,
    config: GameConfig,
    mut on_event: impl FnMut(&GameEvent),
) -> Result<ReplayReport> {
    let config = config.with_view_size(log.view_size.width, log.view_size.height);
    config.validate().context("Invalid game config")?;

    let classifier = ThrowClassifier::new(Box::new(ScriptedClassifier::new(log.throw_labels.clone())));
    let session = GameSession::new(config, classifier);
    let session_id = session.id().to_string();
    let detectors = ScriptedDetector::new(log).detectors();

    let (mut runner, events) =
        GameRunner::start(session, detectors).context("Failed to start frame runner")?;
    runner.start_game();

    let mut stages = Vec::new();
    let mut throws = Vec::new();
    let mut record = |event: GameEvent| {
        on_event(&event);
        match event {
            GameEvent::StageEntered(change) => stages.push(change),
            GameEvent::ThrowCompleted { metrics, .. } => throws.push(metrics),
        }
    };

    for recorded in &log.frames {
        runner
            .submit(VideoFrame::new(recorded.index, recorded.timestamp))
            .context("Frame runner stopped early")?;
        events.try_iter().for_each(&mut record);
    }
    runner.stop();
    events.try_iter().for_each(&mut record);

    let (final_stage, summary) = runner.with_session(|s| (s.stage(), s.summary()));
    info!(frames = log.frames.len(), throws = throws.len(), %final_stage, "replay finished");

    Ok(ReplayReport {
        session_id,
        generated_at: chrono::Utc::now().to_rfc3339(),
        frames: log.frames.len(),
        final_stage,
        stages,
        throws,
        summary,
    })
}

pub fn save_report(path: &Path, report: &ReplayReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

// ========== Tests ==========
