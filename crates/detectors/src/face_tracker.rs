//! Face tracker loop
//!
//! Owns the calibrator, gaze assessor, landmark fallback, blink counter,
//! and face violation timer. Each frame becomes one `FaceRecord`.

use calibration::{CalibrationResult, CalibrationStep, CalibrationStore, Calibrator};
use chrono::Utc;
use gaze::{GazeAssessor, GazeConfig, LiveSignal, Point};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use telemetry::FaceRecord;
use tracing::{error, info, warn};
use violation::{Source, TimerConfig, ViolationTimer};

use crate::fallback::{DEFAULT_FALLBACK_FRAMES, MIN_FACE_QUALITY};
use crate::{
    BlinkConfig, BlinkCounter, CaptureError, ControlSignal, FaceEvent, FaceFeed, FaceLandmarks,
    FaceObservation, LandmarkFallback,
};

/// Face tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceTrackerConfig {
    /// Screen size used for calibration targets
    pub screen_width: u32,
    pub screen_height: u32,
    pub calibration_file: PathBuf,
    /// Frames the last landmarks are reused after the face is lost
    pub landmark_fallback_frames: u32,
    /// Mesh detections at or below this quality fall back to the last landmarks
    pub min_face_quality: f64,
    pub blink: BlinkConfig,
    pub gaze: GazeConfig,
    pub timer: TimerConfig,
}

impl Default for FaceTrackerConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 720,
            calibration_file: PathBuf::from(calibration::DEFAULT_CALIBRATION_FILE),
            landmark_fallback_frames: DEFAULT_FALLBACK_FRAMES,
            min_face_quality: MIN_FACE_QUALITY,
            blink: BlinkConfig::default(),
            gaze: GazeConfig::default(),
            timer: TimerConfig::face(),
        }
    }
}

/// Per-process face tracking context
#[derive(Debug)]
pub struct FaceTracker {
    config: FaceTrackerConfig,
    calibrator: Calibrator,
    store: CalibrationStore,
    assessor: GazeAssessor,
    fallback: LandmarkFallback,
    blinks: BlinkCounter,
    timer: ViolationTimer<String>,
    last_reference: Option<Point>,
    calibration_stale: bool,
    frames: u64,
}

impl FaceTracker {
    /// Create a tracker, loading any persisted calibration
    pub fn new(config: FaceTrackerConfig) -> Self {
        let store = CalibrationStore::new(config.calibration_file.clone());
        let active = store.load_valid();
        match &active {
            Some(cal) => info!(
                "Loaded calibration from {} ({} points)",
                store.path().display(),
                cal.sample_count()
            ),
            None => warn!("No valid calibration, gaze assumed on screen until calibrated"),
        }

        Self {
            calibration_stale: active.as_ref().is_some_and(is_stale),
            calibrator: Calibrator::with_active(active),
            store,
            assessor: GazeAssessor::new(config.gaze.clone()),
            fallback: LandmarkFallback::new(
                config.landmark_fallback_frames,
                config.min_face_quality,
            ),
            blinks: BlinkCounter::new(config.blink.clone()),
            timer: ViolationTimer::new(Source::Face, config.timer.clone()),
            last_reference: None,
            frames: 0,
            config,
        }
    }

    /// Run until the feed ends or a quit signal arrives
    ///
    /// Every processed frame is passed to `emit`.
    pub fn run<F, E>(&mut self, feed: &mut F, mut emit: E) -> Result<(), CaptureError>
    where
        F: FaceFeed,
        E: FnMut(FaceRecord),
    {
        info!("Face tracker started");
        loop {
            let event = match feed.next_event() {
                Ok(event) => event,
                Err(CaptureError::EndOfStream) => {
                    info!("Face input ended after {} frames", self.frames);
                    return Ok(());
                }
                Err(e) => {
                    error!("Face acquisition failed: {}", e);
                    return Err(e);
                }
            };

            match event {
                FaceEvent::Signal(ControlSignal::Quit) => {
                    info!("Face tracker stopping after {} frames", self.frames);
                    return Ok(());
                }
                FaceEvent::Signal(signal) => self.handle_signal(signal),
                FaceEvent::Frame(obs) => emit(self.process_frame(obs, Instant::now())),
            }
        }
    }

    /// Apply an operator signal
    pub fn handle_signal(&mut self, signal: ControlSignal) {
        match signal {
            ControlSignal::StartCalibration => {
                self.timer.reset();
                let target = self
                    .calibrator
                    .start(self.config.screen_width, self.config.screen_height);
                info!(
                    "Look at {} ({:.0}, {:.0}) and confirm",
                    target.id, target.position.x, target.position.y
                );
            }
            ControlSignal::ConfirmTarget => self.confirm_target(),
            ControlSignal::AbortCalibration => {
                self.calibrator.abort();
            }
            ControlSignal::Recenter => {
                if !self.assessor.pose_smoother().recenter() {
                    warn!("Cannot recenter without a head pose estimate");
                }
            }
            ControlSignal::ToggleProctoring => {
                let enabled = self.assessor.toggle();
                if !enabled {
                    self.timer.reset();
                }
                info!(
                    "Proctoring {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            ControlSignal::Quit => {}
        }
    }

    fn confirm_target(&mut self) {
        match self.calibrator.confirm(self.last_reference) {
            Ok(CalibrationStep::Advanced { next, index, total }) => info!(
                "Target {}/{}: look at {} ({:.0}, {:.0})",
                index + 1,
                total,
                next.id,
                next.position.x,
                next.position.y
            ),
            Ok(CalibrationStep::Completed(result)) => {
                self.calibration_stale = false;
                if let Err(e) = self.store.save(&result) {
                    warn!("Calibration active but not saved: {}", e);
                }
            }
            Err(e) => warn!("Calibration step failed: {}", e),
        }
    }

    /// Turn one observation into a telemetry record
    pub fn process_frame(&mut self, obs: FaceObservation, now: Instant) -> FaceRecord {
        self.frames += 1;

        if let Some(ratio) = obs.landmarks.as_ref().and_then(FaceLandmarks::blink_ratio) {
            self.blinks.update(ratio);
        }

        let pupils = self
            .fallback
            .resolve(obs.landmarks, obs.width, obs.height)
            .and_then(|l| l.pupil_centers());

        let Some((left, right)) = pupils else {
            self.last_reference = None;
            return FaceRecord {
                timestamp_ms: obs.timestamp_ms,
                gaze_direction: "no_face".to_string(),
                violation_count: self.timer.count(),
                suspicious_movements: self.assessor.suspicious_movements(),
                proctoring_enabled: self.assessor.is_enabled(),
                no_face: true,
                total_blinks: self.blinks.total(),
                calibration_stale: self.calibration_stale,
                ..Default::default()
            };
        };

        let signal = LiveSignal::from_pupils(left, right, obs.head_pose, obs.timestamp_ms);
        self.last_reference = Some(signal.reference_point);
        let frame_center = Point::new(obs.width as f64 / 2.0, obs.height as f64 / 2.0);

        let mut record = FaceRecord {
            timestamp_ms: obs.timestamp_ms,
            left_pupil: Some([left.x, left.y]),
            right_pupil: Some([right.x, right.y]),
            reference_point: Some([signal.reference_point.x, signal.reference_point.y]),
            proctoring_enabled: self.assessor.is_enabled(),
            total_blinks: self.blinks.total(),
            calibration_stale: self.calibration_stale,
            ..Default::default()
        };

        if self.calibrator.is_collecting() {
            self.assessor.pose_smoother().update(obs.head_pose);
            self.timer.update(None, 0.0, now);
            record.gaze_direction = "calibrating".to_string();
        } else {
            let assessment = self
                .assessor
                .assess(&signal, frame_center, self.calibrator.active());
            let outcome = self.timer.update(
                assessment.violation_kind().map(str::to_string),
                assessment.confidence,
                now,
            );

            record.gaze_direction = assessment.status.clone();
            record.violation_detected = assessment.violation;
            record.flagged = outcome.fired().is_some();
            record.gaze_confidence = assessment.confidence.clamp(0.0, 1.0);
            record.cheat_detected = assessment.cheat_detected;
            record.eye_velocity = assessment.velocity;
        }

        if let Some(pose) = self.assessor.head_pose() {
            record.pitch = pose.pitch;
            record.yaw = pose.yaw;
            record.roll = pose.roll;
        }
        record.violation_duration = self.timer.elapsed(now).as_secs_f64();
        record.violation_count = self.timer.count();
        record.suspicious_movements = self.assessor.suspicious_movements();
        record
    }

    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn total_blinks(&self) -> u32 {
        self.blinks.total()
    }
}

fn is_stale(calibration: &CalibrationResult) -> bool {
    let now = Utc::now();
    if calibration.is_stale(now) {
        warn!(
            "Calibration is {} days old, records will report it stale",
            calibration.age(now).num_days()
        );
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::tests::face_mesh;
    use calibration::{CalibrationPhase, ScreenBounds, TargetId};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> FaceTracker {
        FaceTracker::new(FaceTrackerConfig {
            calibration_file: dir.path().join("calibration.json"),
            ..Default::default()
        })
    }

    fn observation(x: f64, y: f64) -> FaceObservation {
        FaceObservation {
            timestamp_ms: 0,
            width: 640,
            height: 480,
            landmarks: Some(FaceLandmarks::Pupils {
                left: Point::new(x - 20.0, y),
                right: Point::new(x + 20.0, y),
            }),
            head_pose: None,
        }
    }

    /// Run a full calibration with reference points spread over a 120x60 box
    fn calibrate(tracker: &mut FaceTracker, now: Instant) {
        tracker.handle_signal(ControlSignal::StartCalibration);
        let offsets = [
            (0.0, 0.0),
            (-60.0, -30.0),
            (60.0, -30.0),
            (-60.0, 30.0),
            (60.0, 30.0),
            (0.0, -30.0),
            (0.0, 30.0),
            (-60.0, 0.0),
            (60.0, 0.0),
        ];
        for (dx, dy) in offsets {
            tracker.process_frame(observation(320.0 + dx, 240.0 + dy), now);
            tracker.handle_signal(ControlSignal::ConfirmTarget);
        }
    }

    #[test]
    fn test_calibration_persists() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        calibrate(&mut t, Instant::now());

        assert_eq!(t.calibrator().phase(), CalibrationPhase::Ready);
        assert!(dir.path().join("calibration.json").exists());

        let reloaded = tracker(&dir);
        assert_eq!(reloaded.calibrator().phase(), CalibrationPhase::Ready);
    }

    #[test]
    fn test_sustained_glance_flags_once() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let t0 = Instant::now();
        calibrate(&mut t, t0);

        let mut flagged = 0;
        for i in 0..70u64 {
            let record = t.process_frame(observation(100.0, 240.0), t0 + Duration::from_millis(i * 100));
            assert_eq!(record.gaze_direction, "off_screen_left");
            assert!(record.violation_detected);
            if record.flagged {
                flagged += 1;
            }
        }
        assert_eq!(flagged, 1);
    }

    #[test]
    fn test_no_face_after_fallback() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let now = Instant::now();
        t.process_frame(observation(320.0, 240.0), now);

        let missing = FaceObservation {
            width: 640,
            height: 480,
            ..Default::default()
        };
        for _ in 0..10 {
            assert!(!t.process_frame(missing.clone(), now).no_face);
        }
        let record = t.process_frame(missing, now);
        assert!(record.no_face);
        assert_eq!(record.gaze_direction, "no_face");
    }

    #[test]
    fn test_toggle_disables_violations() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let t0 = Instant::now();
        calibrate(&mut t, t0);

        t.handle_signal(ControlSignal::ToggleProctoring);
        for i in 0..70u64 {
            let record = t.process_frame(observation(100.0, 240.0), t0 + Duration::from_millis(i * 100));
            assert!(!record.violation_detected);
            assert!(!record.flagged);
            assert!(!record.proctoring_enabled);
        }
    }

    #[test]
    fn test_run_ends_on_quit() {
        struct Scripted(Vec<FaceEvent>);

        impl FaceFeed for Scripted {
            fn next_event(&mut self) -> Result<FaceEvent, CaptureError> {
                if self.0.is_empty() {
                    return Err(CaptureError::Io("exhausted".into()));
                }
                Ok(self.0.remove(0))
            }
        }

        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let mut feed = Scripted(vec![
            FaceEvent::Frame(observation(320.0, 240.0)),
            FaceEvent::Frame(observation(320.0, 240.0)),
            FaceEvent::Signal(ControlSignal::Quit),
        ]);

        let mut records = Vec::new();
        t.run(&mut feed, |r| records.push(r)).unwrap();
        assert_eq!(records.len(), 2);
    }

    fn mesh_observation(gap: f64) -> FaceObservation {
        FaceObservation {
            width: 640,
            height: 480,
            landmarks: Some(FaceLandmarks::Mesh(face_mesh(gap))),
            ..Default::default()
        }
    }

    #[test]
    fn test_blinks_counted_from_mesh() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let now = Instant::now();

        for gap in [10.0, 0.0, 0.0, 0.0, 10.0, 0.0, 10.0] {
            t.process_frame(mesh_observation(gap), now);
        }
        assert_eq!(t.total_blinks(), 1);
        assert_eq!(t.process_frame(mesh_observation(10.0), now).total_blinks, 1);
    }

    #[test]
    fn test_poor_quality_frame_keeps_last_pupils() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let now = Instant::now();
        let first = t.process_frame(mesh_observation(10.0), now);

        // Iris moved, but the nose tip sits on the frame edge
        let mut partial = face_mesh(10.0);
        partial[4] = Point::new(5.0, 240.0);
        for point in &mut partial[469..478] {
            point.x += 40.0;
        }
        let record = t.process_frame(
            FaceObservation {
                landmarks: Some(FaceLandmarks::Mesh(partial)),
                ..mesh_observation(10.0)
            },
            now,
        );

        assert!(!record.no_face);
        assert_eq!(record.left_pupil, first.left_pupil);
        assert_eq!(record.right_pupil, first.right_pupil);
    }

    #[test]
    fn test_stale_calibration_reported() {
        let dir = TempDir::new().unwrap();
        let samples: BTreeMap<TargetId, Point> = TargetId::ALL
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, Point::new(200.0 + i as f64 * 10.0, 150.0 + i as f64 * 5.0)))
            .collect();
        let created = Utc::now() - chrono::Duration::days(8);
        let old = CalibrationResult::from_samples(ScreenBounds::new(640, 480), samples, created)
            .unwrap();
        CalibrationStore::new(dir.path().join("calibration.json"))
            .save(&old)
            .unwrap();

        let mut t = tracker(&dir);
        assert_eq!(t.calibrator().phase(), CalibrationPhase::Ready);
        assert!(t.process_frame(observation(320.0, 240.0), Instant::now()).calibration_stale);

        // A fresh calibration clears the flag
        calibrate(&mut t, Instant::now());
        assert!(!t.process_frame(observation(320.0, 240.0), Instant::now()).calibration_stale);
    }
}
