//! Telemetry record schema
//!
//! Every field is optional on the wire; missing fields take the defaults
//! documented below. Records are validated after deserialization.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::TelemetryError;

/// Source stream a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Face,
    Object,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Face => f.write_str("face"),
            RecordKind::Object => f.write_str("object"),
        }
    }
}

/// A record type carried over a telemetry stream
pub trait TelemetryRecord: Serialize + DeserializeOwned + Send + 'static {
    const KIND: RecordKind;

    /// Reject records whose values are out of range
    fn validate(&self) -> Result<(), TelemetryError>;
}

/// Per-frame face tracker output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceRecord {
    /// Default 0
    pub timestamp_ms: u64,
    /// Left pupil center, absent when no face
    pub left_pupil: Option<[f64; 2]>,
    pub right_pupil: Option<[f64; 2]>,
    /// Averaged reference point
    pub reference_point: Option<[f64; 2]>,
    /// Smoothed head pose (degrees), default 0
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    /// Gaze status label, default "unknown"
    pub gaze_direction: String,
    /// Frame classified as violating
    pub violation_detected: bool,
    /// Sustained violation fired on this frame
    pub flagged: bool,
    /// Seconds the current episode has lasted
    pub violation_duration: f64,
    pub violation_count: u32,
    /// Classifier confidence in [0, 1]
    pub gaze_confidence: f64,
    pub cheat_detected: bool,
    pub suspicious_movements: u32,
    pub eye_velocity: f64,
    /// Default true
    pub proctoring_enabled: bool,
    /// Frame skipped after the landmark fallback ran out
    pub no_face: bool,
    /// Blinks counted since the tracker started
    pub total_blinks: u32,
    /// Active calibration is older than the staleness limit
    pub calibration_stale: bool,
}

impl Default for FaceRecord {
    fn default() -> Self {
        Self {
            timestamp_ms: 0,
            left_pupil: None,
            right_pupil: None,
            reference_point: None,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            gaze_direction: "unknown".to_string(),
            violation_detected: false,
            flagged: false,
            violation_duration: 0.0,
            violation_count: 0,
            gaze_confidence: 0.0,
            cheat_detected: false,
            suspicious_movements: 0,
            eye_velocity: 0.0,
            proctoring_enabled: true,
            no_face: false,
            total_blinks: 0,
            calibration_stale: false,
        }
    }
}

impl TelemetryRecord for FaceRecord {
    const KIND: RecordKind = RecordKind::Face;

    fn validate(&self) -> Result<(), TelemetryError> {
        check_unit("gaze_confidence", self.gaze_confidence)?;
        check_non_negative("violation_duration", self.violation_duration)?;
        check_non_negative("eye_velocity", self.eye_velocity)?;
        for (field, value) in [("pitch", self.pitch), ("yaw", self.yaw), ("roll", self.roll)] {
            check_finite(field, value)?;
        }
        for (field, point) in [
            ("left_pupil", self.left_pupil),
            ("right_pupil", self.right_pupil),
            ("reference_point", self.reference_point),
        ] {
            if let Some([x, y]) = point {
                check_finite(field, x)?;
                check_finite(field, y)?;
            }
        }
        Ok(())
    }
}

/// Per-frame object watcher output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectRecord {
    /// Default 0
    pub timestamp_ms: u64,
    /// All labels above the confidence floor
    pub detected_objects: Vec<String>,
    /// Detected labels on the prohibited list
    pub prohibited_objects: Vec<String>,
    /// A prohibited object is present
    pub object_violation: bool,
    /// Seconds the current episode has lasted
    pub violation_duration: f64,
    /// Alert already fired for the current episode
    pub violation_triggered: bool,
    pub violation_count: u32,
    /// Model inference time (ms)
    pub inference_time: f64,
    /// Sustained violation fired on this frame
    pub new_violation: bool,
    /// Highest prohibited-label confidence in [0, 1]
    pub detection_confidence: f64,
}

impl TelemetryRecord for ObjectRecord {
    const KIND: RecordKind = RecordKind::Object;

    fn validate(&self) -> Result<(), TelemetryError> {
        check_unit("detection_confidence", self.detection_confidence)?;
        check_non_negative("violation_duration", self.violation_duration)?;
        check_non_negative("inference_time", self.inference_time)
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), TelemetryError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TelemetryError::Invalid {
            field,
            reason: format!("{} is not finite", value),
        })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), TelemetryError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(TelemetryError::Invalid {
            field,
            reason: format!("{} is negative", value),
        });
    }
    Ok(())
}

fn check_unit(field: &'static str, value: f64) -> Result<(), TelemetryError> {
    check_non_negative(field, value)?;
    if value > 1.0 {
        return Err(TelemetryError::Invalid {
            field,
            reason: format!("{} exceeds 1.0", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_defaults_for_missing_fields() {
        let record: FaceRecord = serde_json::from_str(r#"{"flagged": true}"#).unwrap();
        assert!(record.flagged);
        assert_eq!(record.gaze_direction, "unknown");
        assert!(record.proctoring_enabled);
        assert!(record.reference_point.is_none());
        assert_eq!(record.total_blinks, 0);
        assert!(!record.calibration_stale);
    }

    #[test]
    fn test_object_defaults_for_missing_fields() {
        let record: ObjectRecord =
            serde_json::from_str(r#"{"prohibited_objects": ["Phone"], "new_violation": true}"#).unwrap();
        assert_eq!(record.prohibited_objects, vec!["Phone".to_string()]);
        assert!(record.new_violation);
        assert!(record.detected_objects.is_empty());
    }

    #[test]
    fn test_wrong_type_rejected() {
        assert!(serde_json::from_str::<FaceRecord>(r#"{"flagged": "yes"}"#).is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut record = FaceRecord {
            gaze_confidence: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            record.validate(),
            Err(TelemetryError::Invalid { field: "gaze_confidence", .. })
        ));

        record.gaze_confidence = 0.9;
        assert!(record.validate().is_ok());

        let object = ObjectRecord {
            inference_time: -3.0,
            ..Default::default()
        };
        assert!(object.validate().is_err());
    }
}
