//! Calibration targets

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Point;

/// Distance of edge targets from the screen border
pub const TARGET_EDGE_MARGIN: f64 = 50.0;

/// Named calibration positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetId {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
    LeftCenter,
    RightCenter,
}

impl TargetId {
    /// Presentation order of the 9-point sequence
    pub const ALL: [TargetId; 9] = [
        TargetId::Center,
        TargetId::TopLeft,
        TargetId::TopRight,
        TargetId::BottomLeft,
        TargetId::BottomRight,
        TargetId::TopCenter,
        TargetId::BottomCenter,
        TargetId::LeftCenter,
        TargetId::RightCenter,
    ];

    /// Points a persisted calibration must contain to be trusted
    pub const REQUIRED: [TargetId; 5] = [
        TargetId::Center,
        TargetId::TopLeft,
        TargetId::TopRight,
        TargetId::BottomLeft,
        TargetId::BottomRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TargetId::Center => "center",
            TargetId::TopLeft => "top_left",
            TargetId::TopRight => "top_right",
            TargetId::BottomLeft => "bottom_left",
            TargetId::BottomRight => "bottom_right",
            TargetId::TopCenter => "top_center",
            TargetId::BottomCenter => "bottom_center",
            TargetId::LeftCenter => "left_center",
            TargetId::RightCenter => "right_center",
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A target the examinee is asked to look at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTarget {
    pub id: TargetId,
    /// Screen coordinate of the target
    pub position: Point,
}

/// Build the 9 targets for a screen of the given size
pub fn nine_point_targets(width: u32, height: u32) -> Vec<CalibrationTarget> {
    let w = width as f64;
    let h = height as f64;
    let m = TARGET_EDGE_MARGIN;

    TargetId::ALL
        .iter()
        .map(|&id| {
            let (x, y) = match id {
                TargetId::Center => (w / 2.0, h / 2.0),
                TargetId::TopLeft => (m, m),
                TargetId::TopRight => (w - m, m),
                TargetId::BottomLeft => (m, h - m),
                TargetId::BottomRight => (w - m, h - m),
                TargetId::TopCenter => (w / 2.0, m),
                TargetId::BottomCenter => (w / 2.0, h - m),
                TargetId::LeftCenter => (m, h / 2.0),
                TargetId::RightCenter => (w - m, h / 2.0),
            };
            CalibrationTarget {
                id,
                position: Point::new(x, y),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_targets_in_order() {
        let targets = nine_point_targets(640, 480);
        assert_eq!(targets.len(), 9);
        assert_eq!(targets[0].id, TargetId::Center);
        assert_eq!(targets[0].position, Point::new(320.0, 240.0));
        assert_eq!(targets[4].position, Point::new(590.0, 430.0));
    }

    #[test]
    fn test_target_names_serialize_snake_case() {
        let json = serde_json::to_string(&TargetId::BottomCenter).unwrap();
        assert_eq!(json, "\"bottom_center\"");
        assert_eq!(TargetId::TopLeft.to_string(), "top_left");
    }
}
