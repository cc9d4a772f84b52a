//! Live per-frame signals

use serde::{Deserialize, Serialize};

use crate::Point;

/// Head pose (Euler angles, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    /// Up-down tilt
    pub pitch: f64,
    /// Left-right rotation
    pub yaw: f64,
    /// Side tilt
    pub roll: f64,
}

impl HeadPose {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Whether yaw or pitch exceeds `threshold` degrees
    pub fn turned_beyond(&self, threshold: f64) -> bool {
        self.yaw.abs() > threshold || self.pitch.abs() > threshold
    }
}

/// Signal sampled on a single detector tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSignal {
    /// Averaged left/right pupil position
    pub reference_point: Point,
    /// Smoothed head pose, if an estimate is available
    pub head_pose: Option<HeadPose>,
    pub timestamp_ms: u64,
}

impl LiveSignal {
    /// Build a signal from left and right pupil centers
    pub fn from_pupils(left: Point, right: Point, head_pose: Option<HeadPose>, timestamp_ms: u64) -> Self {
        Self {
            reference_point: Point::midpoint(left, right),
            head_pose,
            timestamp_ms,
        }
    }
}
