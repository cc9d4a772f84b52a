//! Calibration result and acceptable gaze zone

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{CalibrationError, Point, TargetId, MIN_SAMPLES};

/// Zone margin as a fraction of the observed range on each axis
pub const ZONE_MARGIN_FACTOR: f64 = 0.1;

/// Smallest margin applied to an axis, keeps the zone non-empty when all
/// samples share one coordinate
pub const MIN_AXIS_MARGIN: f64 = 1.0;

/// Adaptive threshold as a fraction of the observed range
pub const ADAPTIVE_THRESHOLD_FACTOR: f64 = 0.2;

/// Floor for adaptive thresholds
pub const ADAPTIVE_THRESHOLD_FLOOR: f64 = 30.0;

/// Calibrations older than this are flagged stale
pub const STALE_AFTER_DAYS: i64 = 7;

/// Screen geometry the calibration was taken against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
    pub center_x: f64,
    pub center_y: f64,
}

impl ScreenBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            center_x: width as f64 / 2.0,
            center_y: height as f64 / 2.0,
        }
    }
}

/// Acceptable viewing area derived from calibrated reference points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptableZone {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    /// Reference point recorded for the center target
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl AcceptableZone {
    /// Check whether a point lies inside the zone (edges inclusive)
    pub fn contains(&self, point: Point) -> bool {
        self.contains_x(point.x) && self.contains_y(point.y)
    }

    pub fn contains_x(&self, x: f64) -> bool {
        self.left <= x && x <= self.right
    }

    pub fn contains_y(&self, y: f64) -> bool {
        self.top <= y && y <= self.bottom
    }
}

/// Outcome of a completed calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub screen_bounds: ScreenBounds,

    /// Reference point recorded per target
    pub eye_centers: BTreeMap<TargetId, Point>,

    /// Observed (min, max) of reference points on each axis
    pub eye_range_x: (f64, f64),
    pub eye_range_y: (f64, f64),

    pub zone: AcceptableZone,

    pub adaptive_threshold_x: f64,
    pub adaptive_threshold_y: f64,

    pub calibration_timestamp: DateTime<Utc>,
}

impl CalibrationResult {
    /// Derive a calibration from collected samples
    pub fn from_samples(
        screen_bounds: ScreenBounds,
        samples: BTreeMap<TargetId, Point>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CalibrationError> {
        if samples.len() < MIN_SAMPLES {
            return Err(CalibrationError::Insufficient {
                collected: samples.len(),
                required: MIN_SAMPLES,
            });
        }

        let (min_x, max_x) = axis_range(samples.values().map(|p| p.x));
        let (min_y, max_y) = axis_range(samples.values().map(|p| p.y));

        let x_range = max_x - min_x;
        let y_range = max_y - min_y;
        let x_margin = (x_range * ZONE_MARGIN_FACTOR).max(MIN_AXIS_MARGIN);
        let y_margin = (y_range * ZONE_MARGIN_FACTOR).max(MIN_AXIS_MARGIN);

        let center = samples.get(&TargetId::Center).copied().unwrap_or(Point::new(
            (min_x + max_x) / 2.0,
            (min_y + max_y) / 2.0,
        ));

        let zone = AcceptableZone {
            left: min_x - x_margin,
            right: max_x + x_margin,
            top: min_y - y_margin,
            bottom: max_y + y_margin,
            center_x: center.x,
            center_y: center.y,
            width: x_range + 2.0 * x_margin,
            height: y_range + 2.0 * y_margin,
        };

        let result = Self {
            screen_bounds,
            eye_centers: samples,
            eye_range_x: (min_x, max_x),
            eye_range_y: (min_y, max_y),
            zone,
            adaptive_threshold_x: (x_range * ADAPTIVE_THRESHOLD_FACTOR).max(ADAPTIVE_THRESHOLD_FLOOR),
            adaptive_threshold_y: (y_range * ADAPTIVE_THRESHOLD_FACTOR).max(ADAPTIVE_THRESHOLD_FLOOR),
            calibration_timestamp: created_at,
        };
        result.check_zone()?;
        Ok(result)
    }

    /// Validate a persisted calibration before trusting it
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for id in TargetId::REQUIRED {
            if !self.eye_centers.contains_key(&id) {
                return Err(CalibrationError::MissingPoint(id));
            }
        }
        self.check_zone()
    }

    fn check_zone(&self) -> Result<(), CalibrationError> {
        let zone = &self.zone;
        let finite = [zone.left, zone.right, zone.top, zone.bottom, zone.width, zone.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || zone.width <= 0.0 || zone.height <= 0.0 {
            return Err(CalibrationError::DegenerateZone(format!(
                "{:.1}x{:.1}",
                zone.width, zone.height
            )));
        }
        Ok(())
    }

    /// Age of the calibration at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.calibration_timestamp
    }

    /// Stale calibrations remain valid but should be redone
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > Duration::days(STALE_AFTER_DAYS)
    }

    /// Reference point recorded while looking at the screen center
    pub fn center_reference(&self) -> Point {
        Point::new(self.zone.center_x, self.zone.center_y)
    }

    pub fn sample_count(&self) -> usize {
        self.eye_centers.len()
    }
}

fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn full_samples() -> BTreeMap<TargetId, Point> {
        let mut samples = BTreeMap::new();
        samples.insert(TargetId::Center, Point::new(300.0, 220.0));
        samples.insert(TargetId::TopLeft, Point::new(250.0, 190.0));
        samples.insert(TargetId::TopRight, Point::new(350.0, 190.0));
        samples.insert(TargetId::BottomLeft, Point::new(250.0, 250.0));
        samples.insert(TargetId::BottomRight, Point::new(350.0, 250.0));
        samples
    }

    #[test]
    fn test_zone_has_ten_percent_margin() {
        let result =
            CalibrationResult::from_samples(ScreenBounds::new(640, 480), full_samples(), Utc::now())
                .unwrap();

        assert_eq!(result.eye_range_x, (250.0, 350.0));
        assert!((result.zone.left - 240.0).abs() < 1e-9);
        assert!((result.zone.right - 360.0).abs() < 1e-9);
        assert!((result.zone.top - 184.0).abs() < 1e-9);
        assert!((result.zone.bottom - 256.0).abs() < 1e-9);
        assert!((result.zone.width - 120.0).abs() < 1e-9);
        assert_eq!(result.center_reference(), Point::new(300.0, 220.0));
    }

    #[test]
    fn test_adaptive_threshold_floor() {
        let result =
            CalibrationResult::from_samples(ScreenBounds::new(640, 480), full_samples(), Utc::now())
                .unwrap();

        // 20% of 100 = 20 -> floored at 30
        assert_eq!(result.adaptive_threshold_x, 30.0);
        assert_eq!(result.adaptive_threshold_y, 30.0);

        let mut wide = full_samples();
        wide.insert(TargetId::RightCenter, Point::new(600.0, 220.0));
        let result =
            CalibrationResult::from_samples(ScreenBounds::new(640, 480), wide, Utc::now()).unwrap();
        assert!((result.adaptive_threshold_x - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_samples() {
        let mut samples = BTreeMap::new();
        samples.insert(TargetId::Center, Point::new(1.0, 1.0));
        samples.insert(TargetId::TopLeft, Point::new(2.0, 2.0));

        let err = CalibrationResult::from_samples(ScreenBounds::new(640, 480), samples, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Insufficient { collected: 2, required: 3 }));
    }

    #[test]
    fn test_validate_requires_corners() {
        let mut samples = full_samples();
        samples.remove(&TargetId::BottomRight);
        samples.insert(TargetId::TopCenter, Point::new(300.0, 190.0));
        let result =
            CalibrationResult::from_samples(ScreenBounds::new(640, 480), samples, Utc::now())
                .unwrap();

        assert!(matches!(
            result.validate(),
            Err(CalibrationError::MissingPoint(TargetId::BottomRight))
        ));
    }

    #[test]
    fn test_staleness_after_seven_days() {
        let created = Utc::now() - Duration::days(8);
        let result =
            CalibrationResult::from_samples(ScreenBounds::new(640, 480), full_samples(), created)
                .unwrap();

        assert!(result.is_stale(Utc::now()));
        assert!(result.validate().is_ok());
        assert!(!result.is_stale(created + Duration::days(6)));
    }

    proptest! {
        #[test]
        fn prop_zone_positive_and_covers_samples(
            points in prop::collection::vec((-2000.0f64..2000.0, -2000.0f64..2000.0), 3..=9)
        ) {
            let samples: BTreeMap<TargetId, Point> = TargetId::ALL
                .iter()
                .zip(points.iter())
                .map(|(&id, &(x, y))| (id, Point::new(x, y)))
                .collect();

            let result = CalibrationResult::from_samples(
                ScreenBounds::new(1920, 1080),
                samples.clone(),
                Utc::now(),
            ).unwrap();

            prop_assert!(result.zone.width > 0.0);
            prop_assert!(result.zone.height > 0.0);
            for p in samples.values() {
                prop_assert!(result.eye_range_x.0 <= p.x && p.x <= result.eye_range_x.1);
                prop_assert!(result.eye_range_y.0 <= p.y && p.y <= result.eye_range_y.1);
                prop_assert!(result.zone.contains(*p));
            }
        }
    }
}
