//! Decision engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scoring rules and window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Trailing window for violation history (seconds)
    pub window_secs: u64,

    /// Gaze violations in window needed for the gaze rule
    pub face_threshold: usize,
    pub face_weight: f64,

    /// Object violations in window needed for the object rule
    pub object_threshold: usize,
    pub object_weight: f64,

    /// Total violations in window needed for the pattern rule
    pub total_threshold: usize,
    pub total_weight: f64,

    /// Confidence at or above which the session is flagged
    pub cheating_threshold: f64,

    /// Display event log capacity
    pub event_log_capacity: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,
            face_threshold: 3,
            face_weight: 0.4,
            object_threshold: 1,
            object_weight: 0.5,
            total_threshold: 5,
            total_weight: 0.3,
            cheating_threshold: 0.7,
            event_log_capacity: 50,
        }
    }
}

impl DecisionConfig {
    /// Create strict config (fewer violations needed)
    pub fn strict() -> Self {
        Self {
            face_threshold: 2,
            total_threshold: 3,
            cheating_threshold: 0.6,
            ..Default::default()
        }
    }

    /// Create lenient config (more violations needed)
    pub fn lenient() -> Self {
        Self {
            face_threshold: 5,
            total_threshold: 8,
            cheating_threshold: 0.8,
            ..Default::default()
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}
