//! Per-frame face assessment
//!
//! Combines zone classification, movement pattern, and head pose into one
//! verdict. The zone verdict is primary; the movement pattern only matters
//! while the gaze is inside the zone, and head pose only adjusts confidence.

use calibration::CalibrationResult;
use serde::Serialize;
use tracing::debug;

use crate::{
    classify_zone, GazeConfig, HeadPose, HeadPoseSmoother, LiveSignal, MovementAssessment,
    PatternAnalyzer, Point, ZoneVerdict,
};

/// Status reported for tolerated downward glances
pub const LOOKING_DOWN: &str = "looking_down";

/// Verdict for a single frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceAssessment {
    /// Gaze status label (zone or `suspicious_<type>`)
    pub status: String,
    /// Frame counts toward a violation
    pub violation: bool,
    pub confidence: f64,
    /// Eyes moved away without the head following
    pub cheat_detected: bool,
    pub zone_info: String,
    pub deviation: f64,
    pub velocity: f64,
    pub head_turned: bool,
}

impl FaceAssessment {
    /// Violation kind for the debounce timer, if this frame violates
    pub fn violation_kind(&self) -> Option<&str> {
        self.violation.then_some(self.status.as_str())
    }

    fn paused() -> Self {
        Self {
            status: "proctoring_paused".to_string(),
            violation: false,
            confidence: 0.0,
            cheat_detected: false,
            zone_info: "proctoring_disabled".to_string(),
            deviation: 0.0,
            velocity: 0.0,
            head_turned: false,
        }
    }
}

/// Stateful per-frame gaze assessor
#[derive(Debug)]
pub struct GazeAssessor {
    config: GazeConfig,
    analyzer: PatternAnalyzer,
    pose: HeadPoseSmoother,
    enabled: bool,
}

impl GazeAssessor {
    pub fn new(config: GazeConfig) -> Self {
        Self {
            analyzer: PatternAnalyzer::new(config.pattern.clone()),
            pose: HeadPoseSmoother::new(config.smoothing_window),
            config,
            enabled: true,
        }
    }

    pub fn pose_smoother(&mut self) -> &mut HeadPoseSmoother {
        &mut self.pose
    }

    /// Current smoothed head pose
    pub fn head_pose(&self) -> Option<HeadPose> {
        self.pose.current()
    }

    /// Suspicious movement events seen so far
    pub fn suspicious_movements(&self) -> u32 {
        self.analyzer.suspicious_count()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle proctoring; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.analyzer.reset();
        }
        self.enabled
    }

    /// Assess one frame
    ///
    /// `signal.head_pose` is the raw estimate; smoothing happens here.
    pub fn assess(
        &mut self,
        signal: &LiveSignal,
        frame_center: Point,
        calibration: Option<&CalibrationResult>,
    ) -> FaceAssessment {
        let pose = self.pose.update(signal.head_pose);
        if !self.enabled {
            return FaceAssessment::paused();
        }

        let verdict = classify_zone(signal.reference_point, calibration);
        let movement = self.analyzer.analyze(signal.reference_point, frame_center);
        let head_turned = pose.is_some_and(|p| p.turned_beyond(self.config.head_turn_degrees));

        let assessment = self.compose(&verdict, &movement, head_turned);
        if assessment.violation {
            debug!(
                "Gaze violation {} (confidence {:.2}, {})",
                assessment.status, assessment.confidence, assessment.zone_info
            );
        }
        assessment
    }

    fn compose(
        &self,
        verdict: &ZoneVerdict,
        movement: &MovementAssessment,
        head_turned: bool,
    ) -> FaceAssessment {
        let base = FaceAssessment {
            status: verdict.zone.to_string(),
            violation: false,
            confidence: 0.0,
            cheat_detected: false,
            zone_info: "normal".to_string(),
            deviation: verdict.deviation,
            velocity: movement.velocity,
            head_turned,
        };

        if !verdict.within_bounds {
            if verdict.zone.is_allowed_exception() {
                return FaceAssessment {
                    status: LOOKING_DOWN.to_string(),
                    zone_info: "allowed_looking_down".to_string(),
                    ..base
                };
            }

            let mut confidence = (0.5 + verdict.deviation).min(0.9);
            let eye_only = !head_turned && verdict.deviation > self.config.eye_only_deviation;
            if eye_only {
                confidence = (confidence + 0.2).min(0.95);
            }
            return FaceAssessment {
                violation: true,
                confidence,
                cheat_detected: eye_only,
                zone_info: format!("deviation_{:.2}", verdict.deviation),
                ..base
            };
        }

        if movement.suspicious {
            return FaceAssessment {
                status: format!("suspicious_{}", movement.movement),
                violation: true,
                confidence: movement.confidence,
                cheat_detected: true,
                zone_info: "suspicious_pattern".to_string(),
                ..base
            };
        }

        base
    }

    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.pose.reset();
    }
}

impl Default for GazeAssessor {
    fn default() -> Self {
        Self::new(GazeConfig::default())
    }
}
