//! Screen Calibration
//!
//! Guided 9-point calibration of the examinee's gaze against the monitor:
//! - Named target generation (center, corners, edge midpoints)
//! - Reference point collection state machine
//! - Acceptable gaze zone and adaptive thresholds
//! - Durable calibration store with staleness reporting

pub mod calibrator;
pub mod result;
pub mod store;
pub mod target;

pub use calibrator::{CalibrationPhase, CalibrationStep, Calibrator};
pub use result::{AcceptableZone, CalibrationResult, ScreenBounds};
pub use store::{CalibrationStore, DEFAULT_CALIBRATION_FILE};
pub use target::{nine_point_targets, CalibrationTarget, TargetId};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of distinct target samples for a usable calibration
pub const MIN_SAMPLES: usize = 3;

/// Calibration error types
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Insufficient calibration data: {collected} of {required} points collected")]
    Insufficient { collected: usize, required: usize },

    #[error("Calibration is not collecting samples")]
    NotCollecting,

    #[error("Calibrated zone is degenerate: {0}")]
    DegenerateZone(String),

    #[error("Calibration record is missing required point: {0}")]
    MissingPoint(TargetId),

    #[error("No calibration file at {0}")]
    NotFound(String),

    #[error("Calibration file is corrupt: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CalibrationError {
    fn from(err: std::io::Error) -> Self {
        CalibrationError::Io(err.to_string())
    }
}

/// 2D reference point in screen/frame space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint of two points (e.g. left and right pupil)
    pub fn midpoint(a: Point, b: Point) -> Self {
        Self {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
