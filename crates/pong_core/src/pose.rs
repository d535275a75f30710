//! Rolling pose history for throw classification
//!
//! Holds the most recent pose observations in chronological order. When full,
//! the oldest observation is evicted before the new one is appended.

use std::collections::VecDeque;

use crate::detection::PoseObservation;

/// Default capacity: three seconds of video at 30 fps.
pub const POSE_HISTORY_CAPACITY: usize = 90;

#[derive(Debug, Clone)]
pub struct PoseHistoryBuffer {
    observations: VecDeque<PoseObservation>,
    capacity: usize,
}

impl PoseHistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(POSE_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { observations: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn store(&mut self, observation: PoseObservation) {
        if self.observations.len() >= self.capacity {
            self.observations.pop_front();
        }
        self.observations.push_back(observation);
    }

    pub fn reset(&mut self) {
        self.observations.clear();
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PoseObservation> + '_ {
        self.observations.iter()
    }

    pub fn latest(&self) -> Option<&PoseObservation> {
        self.observations.back()
    }
}

impl Default for PoseHistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_at(t: f64) -> PoseObservation {
        PoseObservation { confidence: 0.9, timestamp: t, ..Default::default() }
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = PoseHistoryBuffer::new();
        for i in 0..200 {
            buffer.store(pose_at(i as f64));
            assert!(buffer.len() <= POSE_HISTORY_CAPACITY);
        }
        assert_eq!(buffer.len(), POSE_HISTORY_CAPACITY);
    }

    #[test]
    fn test_91st_store_evicts_oldest() {
        let mut buffer = PoseHistoryBuffer::new();
        for i in 0..91 {
            buffer.store(pose_at(i as f64));
        }
        let timestamps: Vec<f64> = buffer.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps.first(), Some(&1.0));
        assert_eq!(timestamps.last(), Some(&90.0));
        assert_eq!(buffer.latest().map(|p| p.timestamp), Some(90.0));
    }

    #[test]
    fn test_reset_clears() {
        let mut buffer = PoseHistoryBuffer::with_capacity(3);
        buffer.store(pose_at(0.0));
        buffer.store(pose_at(1.0));
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }
}
