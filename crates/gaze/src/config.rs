//! Gaze configuration

use serde::{Deserialize, Serialize};

/// Eye-movement pattern thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Number of reference points kept in the sliding window
    pub window: usize,

    /// Deviation from frame center considered high (pixels)
    pub deviation_threshold: f64,

    /// Velocity considered rapid (pixels per tick)
    pub rapid_velocity: f64,

    /// Horizontal variance above which a scan is suspected
    pub scan_variance_x: f64,

    /// Vertical variance below which a scan is suspected
    pub scan_variance_y: f64,

    /// Suspicious-event count after which warnings are logged
    pub warn_after: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            window: 5,
            deviation_threshold: 30.0,
            rapid_velocity: 20.0,
            scan_variance_x: 400.0,
            scan_variance_y: 100.0,
            warn_after: 10,
        }
    }
}

/// Gaze analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Head rotation considered significant (degrees)
    pub head_turn_degrees: f64,

    /// Moving-average window for head pose angles (samples)
    pub smoothing_window: usize,

    /// Zone deviation above which an eye-only movement is flagged as cheating
    pub eye_only_deviation: f64,

    pub pattern: PatternConfig,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            head_turn_degrees: 25.0,
            smoothing_window: 15,
            eye_only_deviation: 0.3,
            pattern: PatternConfig::default(),
        }
    }
}

impl GazeConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            head_turn_degrees: 15.0,
            eye_only_deviation: 0.2,
            pattern: PatternConfig {
                deviation_threshold: 20.0,
                rapid_velocity: 15.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            head_turn_degrees: 35.0,
            eye_only_deviation: 0.45,
            pattern: PatternConfig {
                deviation_threshold: 45.0,
                rapid_velocity: 30.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
