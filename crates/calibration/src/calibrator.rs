//! Calibration state machine

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::{
    nine_point_targets, CalibrationError, CalibrationResult, CalibrationTarget, Point,
    ScreenBounds, TargetId,
};

/// Calibrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// No calibration running and none active
    Idle,
    /// Collecting the reference point for target `index`
    Collecting { index: usize },
    /// A calibration result is active
    Ready,
}

/// Outcome of confirming a target
#[derive(Debug, Clone)]
pub enum CalibrationStep {
    /// Moved on to the next target
    Advanced {
        next: CalibrationTarget,
        index: usize,
        total: usize,
    },
    /// All targets visited, new calibration is active
    Completed(CalibrationResult),
}

/// Guided 9-point calibrator
///
/// `Idle -> Collecting(0..8) -> Ready`. Aborting or failing a run keeps the
/// previously active calibration.
#[derive(Debug, Default)]
pub struct Calibrator {
    targets: Vec<CalibrationTarget>,
    index: usize,
    samples: BTreeMap<TargetId, Point>,
    screen: Option<ScreenBounds>,
    collecting: bool,
    active: Option<CalibrationResult>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calibrator with an already active calibration (e.g. loaded from disk)
    pub fn with_active(active: Option<CalibrationResult>) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        if self.collecting {
            CalibrationPhase::Collecting { index: self.index }
        } else if self.active.is_some() {
            CalibrationPhase::Ready
        } else {
            CalibrationPhase::Idle
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Begin a new calibration run for a screen of the given size
    pub fn start(&mut self, width: u32, height: u32) -> CalibrationTarget {
        self.targets = nine_point_targets(width, height);
        self.index = 0;
        self.samples.clear();
        self.screen = Some(ScreenBounds::new(width, height));
        self.collecting = true;

        info!(
            "Calibration started for {}x{} screen ({} targets)",
            width,
            height,
            self.targets.len()
        );
        self.targets[0]
    }

    /// Target the examinee should currently look at
    pub fn current_target(&self) -> Option<&CalibrationTarget> {
        if self.collecting {
            self.targets.get(self.index)
        } else {
            None
        }
    }

    /// Confirm the current target with the live reference point
    ///
    /// `None` (no usable point this frame) skips the target.
    pub fn confirm(&mut self, point: Option<Point>) -> Result<CalibrationStep, CalibrationError> {
        if !self.collecting {
            return Err(CalibrationError::NotCollecting);
        }
        let target = self.targets[self.index];

        match point.filter(Point::is_finite) {
            Some(p) => {
                self.samples.insert(target.id, p);
                info!(
                    "Target {}/{} ({}) recorded at ({:.1}, {:.1})",
                    self.index + 1,
                    self.targets.len(),
                    target.id,
                    p.x,
                    p.y
                );
            }
            None => warn!("No reference point for target {}, skipping", target.id),
        }

        self.index += 1;
        if let Some(next) = self.targets.get(self.index) {
            return Ok(CalibrationStep::Advanced {
                next: *next,
                index: self.index,
                total: self.targets.len(),
            });
        }

        self.finish()
    }

    fn finish(&mut self) -> Result<CalibrationStep, CalibrationError> {
        self.collecting = false;
        let samples = std::mem::take(&mut self.samples);
        let screen = self.screen.take().unwrap_or(ScreenBounds::new(0, 0));

        let result = CalibrationResult::from_samples(screen, samples, Utc::now()).map_err(|e| {
            warn!("Calibration failed: {}", e);
            e
        })?;

        info!(
            "Calibration completed: range x {:?}, range y {:?}, thresholds ({:.1}, {:.1})",
            result.eye_range_x,
            result.eye_range_y,
            result.adaptive_threshold_x,
            result.adaptive_threshold_y
        );
        self.active = Some(result.clone());
        Ok(CalibrationStep::Completed(result))
    }

    /// Abandon the running calibration; returns whether one was running
    pub fn abort(&mut self) -> bool {
        if !self.collecting {
            return false;
        }
        self.collecting = false;
        self.samples.clear();
        self.screen = None;
        info!("Calibration aborted at target {}", self.index + 1);
        true
    }

    /// Currently active calibration
    pub fn active(&self) -> Option<&CalibrationResult> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, result: Option<CalibrationResult>) {
        self.active = result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_full(cal: &mut Calibrator) -> Result<CalibrationStep, CalibrationError> {
        cal.start(640, 480);
        let mut last = None;
        for i in 0..9 {
            let p = Point::new(250.0 + (i % 3) as f64 * 50.0, 190.0 + (i / 3) as f64 * 30.0);
            last = Some(cal.confirm(Some(p)));
        }
        last.unwrap()
    }

    #[test]
    fn test_full_run_completes() {
        let mut cal = Calibrator::new();
        assert_eq!(cal.phase(), CalibrationPhase::Idle);

        let step = run_full(&mut cal).unwrap();
        assert!(matches!(step, CalibrationStep::Completed(_)));
        assert_eq!(cal.phase(), CalibrationPhase::Ready);
        assert_eq!(cal.active().unwrap().sample_count(), 9);
    }

    #[test]
    fn test_advances_through_targets() {
        let mut cal = Calibrator::new();
        let first = cal.start(800, 600);
        assert_eq!(first.id, TargetId::Center);

        match cal.confirm(Some(Point::new(1.0, 1.0))).unwrap() {
            CalibrationStep::Advanced { next, index, total } => {
                assert_eq!(next.id, TargetId::TopLeft);
                assert_eq!(index, 1);
                assert_eq!(total, 9);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(cal.phase(), CalibrationPhase::Collecting { index: 1 });
    }

    #[test]
    fn test_insufficient_keeps_previous() {
        let mut cal = Calibrator::new();
        run_full(&mut cal).unwrap();
        let previous = cal.active().cloned();

        cal.start(640, 480);
        cal.confirm(Some(Point::new(1.0, 2.0))).unwrap();
        cal.confirm(Some(Point::new(5.0, 9.0))).unwrap();
        let mut outcome = None;
        for _ in 2..9 {
            outcome = Some(cal.confirm(None));
        }

        assert!(matches!(
            outcome.unwrap(),
            Err(CalibrationError::Insufficient { collected: 2, .. })
        ));
        assert_eq!(cal.active().cloned(), previous);
        assert_eq!(cal.phase(), CalibrationPhase::Ready);
    }

    #[test]
    fn test_abort_keeps_previous() {
        let mut cal = Calibrator::new();
        assert!(!cal.abort());

        cal.start(640, 480);
        cal.confirm(Some(Point::new(1.0, 2.0))).unwrap();
        assert!(cal.abort());
        assert_eq!(cal.phase(), CalibrationPhase::Idle);
        assert!(cal.active().is_none());
        assert!(matches!(cal.confirm(None), Err(CalibrationError::NotCollecting)));
    }

    #[test]
    fn test_non_finite_point_skipped() {
        let mut cal = Calibrator::new();
        cal.start(640, 480);
        cal.confirm(Some(Point::new(f64::NAN, 1.0))).unwrap();
        for i in 1..9 {
            cal.confirm(Some(Point::new(i as f64 * 10.0, i as f64 * 3.0))).unwrap();
        }
        let active = cal.active().unwrap();
        assert_eq!(active.sample_count(), 8);
        assert!(!active.eye_centers.contains_key(&TargetId::Center));
    }
}
