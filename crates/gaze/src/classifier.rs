//! Acceptable-zone classification

use calibration::CalibrationResult;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::Point;

/// Direction of an off-screen glance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// Gaze zone label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeZone {
    /// No calibration available, gaze assumed on screen
    ScreenCenter,
    WithinScreen,
    OffScreen(Direction),
}

impl GazeZone {
    /// Downward glances (keyboard, scratch paper) are tolerated
    pub fn is_allowed_exception(&self) -> bool {
        matches!(self, GazeZone::OffScreen(Direction::Down))
    }
}

impl fmt::Display for GazeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GazeZone::ScreenCenter => write!(f, "screen_center"),
            GazeZone::WithinScreen => write!(f, "within_screen"),
            GazeZone::OffScreen(dir) => write!(f, "off_screen_{}", dir.as_str()),
        }
    }
}

impl Serialize for GazeZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of classifying one reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneVerdict {
    pub within_bounds: bool,
    pub zone: GazeZone,
    /// Overshoot relative to zone size, clamped to [0, 1]
    pub deviation: f64,
}

impl ZoneVerdict {
    const fn screen_center() -> Self {
        Self {
            within_bounds: true,
            zone: GazeZone::ScreenCenter,
            deviation: 0.0,
        }
    }
}

/// Classify a reference point against the calibrated acceptable zone
///
/// Without a calibration the point is assumed on screen. When the point is
/// outside on both axes, the axis with the larger overshoot (normalized by
/// zone size) names the direction; ties go vertical.
pub fn classify_zone(point: Point, calibration: Option<&CalibrationResult>) -> ZoneVerdict {
    let Some(cal) = calibration else {
        return ZoneVerdict::screen_center();
    };
    if !point.is_finite() {
        return ZoneVerdict::screen_center();
    }

    let zone = &cal.zone;
    if zone.contains(point) {
        return ZoneVerdict {
            within_bounds: true,
            zone: GazeZone::WithinScreen,
            deviation: 0.0,
        };
    }

    let (h_over, h_dir) = if point.x < zone.left {
        (zone.left - point.x, Some(Direction::Left))
    } else if point.x > zone.right {
        (point.x - zone.right, Some(Direction::Right))
    } else {
        (0.0, None)
    };

    let (v_over, v_dir) = if point.y < zone.top {
        (zone.top - point.y, Some(Direction::Up))
    } else if point.y > zone.bottom {
        (point.y - zone.bottom, Some(Direction::Down))
    } else {
        (0.0, None)
    };

    let h_norm = h_over / zone.width;
    let v_norm = v_over / zone.height;

    let (direction, norm) = match (h_dir, v_dir) {
        (Some(h), Some(_)) if h_norm > v_norm => (h, h_norm),
        (_, Some(v)) => (v, v_norm),
        (Some(h), None) => (h, h_norm),
        (None, None) => return ZoneVerdict::screen_center(),
    };

    ZoneVerdict {
        within_bounds: false,
        zone: GazeZone::OffScreen(direction),
        deviation: norm.min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calibration::{ScreenBounds, TargetId};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Samples span [100, 300] x [100, 200]; zone is [80, 320] x [90, 210]
    fn calibration() -> CalibrationResult {
        let mut samples = BTreeMap::new();
        samples.insert(TargetId::Center, Point::new(200.0, 150.0));
        samples.insert(TargetId::TopLeft, Point::new(100.0, 100.0));
        samples.insert(TargetId::BottomRight, Point::new(300.0, 200.0));
        CalibrationResult::from_samples(ScreenBounds::new(640, 480), samples, Utc::now()).unwrap()
    }

    #[test]
    fn test_zone_fixture() {
        let cal = calibration();
        assert!((cal.zone.left - 80.0).abs() < 1e-9);
        assert!((cal.zone.right - 320.0).abs() < 1e-9);
        assert!((cal.zone.top - 90.0).abs() < 1e-9);
        assert!((cal.zone.bottom - 210.0).abs() < 1e-9);
    }

    #[test]
    fn test_uncalibrated_is_screen_center() {
        let v = classify_zone(Point::new(5000.0, -20.0), None);
        assert!(v.within_bounds);
        assert_eq!(v.zone, GazeZone::ScreenCenter);
        assert_eq!(v.deviation, 0.0);
    }

    #[test]
    fn test_inside_zone() {
        let cal = calibration();
        let v = classify_zone(Point::new(200.0, 150.0), Some(&cal));
        assert!(v.within_bounds);
        assert_eq!(v.zone.to_string(), "within_screen");
    }

    #[test]
    fn test_right_overshoot() {
        let cal = calibration();
        let v = classify_zone(Point::new(380.0, 150.0), Some(&cal));
        assert!(!v.within_bounds);
        assert_eq!(v.zone.to_string(), "off_screen_right");
        assert!((v.deviation - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_axis_normalized() {
        let cal = calibration();
        // 48/240 = 0.2 horizontal vs 36/120 = 0.3 vertical
        let v = classify_zone(Point::new(32.0, 54.0), Some(&cal));
        assert_eq!(v.zone, GazeZone::OffScreen(Direction::Up));
        assert!((v.deviation - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_down_is_allowed_exception() {
        let cal = calibration();
        let v = classify_zone(Point::new(200.0, 260.0), Some(&cal));
        assert_eq!(v.zone.to_string(), "off_screen_down");
        assert!(v.zone.is_allowed_exception());
        assert!(!GazeZone::OffScreen(Direction::Left).is_allowed_exception());
    }

    #[test]
    fn test_deviation_clamped() {
        let cal = calibration();
        let v = classify_zone(Point::new(2000.0, 150.0), Some(&cal));
        assert_eq!(v.deviation, 1.0);
    }

    proptest! {
        #[test]
        fn prop_deviation_in_unit_range(x in -5000.0f64..5000.0, y in -5000.0f64..5000.0) {
            let cal = calibration();
            let p = Point::new(x, y);
            let v = classify_zone(p, Some(&cal));
            prop_assert!((0.0..=1.0).contains(&v.deviation));
            prop_assert_eq!(v.within_bounds, cal.zone.contains(p));
        }
    }
}
