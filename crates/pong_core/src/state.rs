//! Game stage machine
//!
//! One current stage, a static adjacency table of legal successors, and an
//! ordered observer list notified synchronously on every committed transition.
//!
//! Rules:
//! - `enter` to a stage outside the current stage's successor set is a silent no-op.
//! - `Inactive` is reachable from every stage (reset escape hatch).
//! - Observers run in registration order, before `enter` returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStage {
    Inactive,
    SetupCamera,
    DetectingTarget,
    DetectedTarget,
    DetectingPlayer,
    DetectedPlayer,
    TrackingThrows,
    ThrowCompleted,
    ShowSummary,
}

impl GameStage {
    pub const ALL: [GameStage; 9] = [
        GameStage::Inactive,
        GameStage::SetupCamera,
        GameStage::DetectingTarget,
        GameStage::DetectedTarget,
        GameStage::DetectingPlayer,
        GameStage::DetectedPlayer,
        GameStage::TrackingThrows,
        GameStage::ThrowCompleted,
        GameStage::ShowSummary,
    ];

    /// Successors besides `Inactive`, which is always allowed.
    pub fn successors(&self) -> &'static [GameStage] {
        match self {
            GameStage::Inactive => &[GameStage::SetupCamera],
            GameStage::SetupCamera => &[GameStage::DetectingTarget],
            GameStage::DetectingTarget => &[GameStage::DetectedTarget],
            GameStage::DetectedTarget => &[GameStage::DetectingPlayer],
            GameStage::DetectingPlayer => &[GameStage::DetectedPlayer],
            GameStage::DetectedPlayer => &[GameStage::TrackingThrows],
            GameStage::TrackingThrows => &[GameStage::ThrowCompleted, GameStage::ShowSummary],
            GameStage::ThrowCompleted => &[GameStage::ShowSummary, GameStage::TrackingThrows],
            GameStage::ShowSummary => &[GameStage::DetectingPlayer],
        }
    }

    pub fn is_valid_next(&self, next: GameStage) -> bool {
        next == GameStage::Inactive || self.successors().contains(&next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStage::Inactive => "inactive",
            GameStage::SetupCamera => "setup_camera",
            GameStage::DetectingTarget => "detecting_target",
            GameStage::DetectedTarget => "detected_target",
            GameStage::DetectingPlayer => "detecting_player",
            GameStage::DetectedPlayer => "detected_player",
            GameStage::TrackingThrows => "tracking_throws",
            GameStage::ThrowCompleted => "throw_completed",
            GameStage::ShowSummary => "show_summary",
        }
    }
}

impl fmt::Display for GameStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageChange {
    pub new: GameStage,
    pub previous: GameStage,
}

/// Reacts to stage entry.
///
/// Called with the machine mid-update; implementations must not try to drive
/// the machine from inside the callback.
pub trait StageObserver: Send {
    fn stage_entered(&mut self, change: StageChange);
}

impl<F> StageObserver for F
where
    F: FnMut(StageChange) + Send,
{
    fn stage_entered(&mut self, change: StageChange) {
        self(change)
    }
}

pub struct GameStateMachine {
    current: GameStage,
    observers: Vec<Box<dyn StageObserver>>,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameStateMachine")
            .field("current", &self.current)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self { current: GameStage::Inactive, observers: Vec::new() }
    }

    pub fn current(&self) -> GameStage {
        self.current
    }

    pub fn is_in(&self, stage: GameStage) -> bool {
        self.current == stage
    }

    pub fn can_enter(&self, target: GameStage) -> bool {
        self.current.is_valid_next(target)
    }

    pub fn add_observer(&mut self, observer: Box<dyn StageObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Commit a transition and notify observers.
    ///
    /// Returns `false` (and changes nothing) when `target` is not a legal successor.
    pub fn enter(&mut self, target: GameStage) -> bool {
        let previous = self.current;
        if !previous.is_valid_next(target) {
            debug!(from = %previous, to = %target, "ignoring invalid stage transition");
            return false;
        }
        self.current = target;
        info!(from = %previous, to = %target, "stage entered");

        let change = StageChange { new: target, previous };
        for observer in self.observers.iter_mut() {
            observer.stage_entered(change);
        }
        true
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn machine_at(stage: GameStage) -> GameStateMachine {
        // walk the happy path until `stage` is current
        let path = [
            GameStage::SetupCamera,
            GameStage::DetectingTarget,
            GameStage::DetectedTarget,
            GameStage::DetectingPlayer,
            GameStage::DetectedPlayer,
            GameStage::TrackingThrows,
            GameStage::ThrowCompleted,
            GameStage::ShowSummary,
        ];
        let mut m = GameStateMachine::new();
        for next in path {
            if m.current() == stage {
                break;
            }
            assert!(m.enter(next));
        }
        assert_eq!(m.current(), stage);
        m
    }

    #[test]
    fn test_invalid_transitions_leave_stage_unchanged() {
        for from in GameStage::ALL {
            for to in GameStage::ALL {
                if to == GameStage::Inactive || from.successors().contains(&to) {
                    continue;
                }
                let mut m = machine_at(from);
                assert!(!m.enter(to), "{from} -> {to} should be rejected");
                assert_eq!(m.current(), from);
            }
        }
    }

    #[test]
    fn test_inactive_reachable_from_every_stage() {
        for from in GameStage::ALL {
            let mut m = machine_at(from);
            assert!(m.enter(GameStage::Inactive));
            assert_eq!(m.current(), GameStage::Inactive);
        }
    }

    #[test]
    fn test_throw_loop_and_summary_edges() {
        let mut m = machine_at(GameStage::TrackingThrows);
        assert!(m.enter(GameStage::ThrowCompleted));
        assert!(m.enter(GameStage::TrackingThrows));
        assert!(m.enter(GameStage::ShowSummary));
        assert!(!m.enter(GameStage::TrackingThrows));
        assert!(m.enter(GameStage::DetectingPlayer));
    }

    #[test]
    fn test_observers_notified_in_registration_order() {
        let log: Arc<Mutex<Vec<(usize, StageChange)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut m = GameStateMachine::new();
        for id in 0..3 {
            let log = Arc::clone(&log);
            m.add_observer(Box::new(move |change: StageChange| {
                log.lock().unwrap().push((id, change));
            }));
        }

        assert!(m.enter(GameStage::SetupCamera));
        assert!(!m.enter(GameStage::ShowSummary));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        let expected =
            StageChange { new: GameStage::SetupCamera, previous: GameStage::Inactive };
        for (i, (id, change)) in log.iter().enumerate() {
            assert_eq!(*id, i);
            assert_eq!(*change, expected);
        }
    }

    #[cfg(all(test, feature = "proptest"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_stage() -> impl Strategy<Value = GameStage> {
            (0usize..GameStage::ALL.len()).prop_map(|i| GameStage::ALL[i])
        }

        proptest! {
            /// Property: any request sequence keeps the machine on legal edges only
            #[test]
            fn prop_only_legal_edges_are_taken(requests in proptest::collection::vec(any_stage(), 0..64)) {
                let mut m = GameStateMachine::new();
                for target in requests {
                    let before = m.current();
                    let entered = m.enter(target);
                    prop_assert_eq!(entered, before.is_valid_next(target));
                    if entered {
                        prop_assert_eq!(m.current(), target);
                    } else {
                        prop_assert_eq!(m.current(), before);
                    }
                }
            }
        }
    }
}
