//! Blink counting from the eye closure ratio

use serde::{Deserialize, Serialize};

/// Ratio at or below which the eyes count as closed
pub const BLINK_THRESHOLD: f64 = 0.51;

/// Closed frames that must be exceeded for a blink to count
pub const BLINK_MIN_FRAMES: u32 = 2;

/// Blink counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub threshold: f64,
    pub min_closed_frames: u32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            threshold: BLINK_THRESHOLD,
            min_closed_frames: BLINK_MIN_FRAMES,
        }
    }
}

/// Counts closed-then-open eye episodes
#[derive(Debug, Clone, Default)]
pub struct BlinkCounter {
    config: BlinkConfig,
    closed_frames: u32,
    total: u32,
}

impl BlinkCounter {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            closed_frames: 0,
            total: 0,
        }
    }

    /// Feed one frame's closure ratio; returns true when a blink completes
    pub fn update(&mut self, ratio: f64) -> bool {
        if ratio <= self.config.threshold {
            self.closed_frames = self.closed_frames.saturating_add(1);
            return false;
        }

        let blinked = self.closed_frames > self.config.min_closed_frames;
        if blinked {
            self.total += 1;
        }
        self.closed_frames = 0;
        blinked
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}
