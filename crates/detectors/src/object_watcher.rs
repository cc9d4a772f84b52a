//! Object watcher loop
//!
//! Filters detections to the prohibited list and debounces them into
//! violation episodes keyed by the set of prohibited labels present.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::ObjectRecord;
use tracing::{debug, error, info};
use violation::{LabelSet, Source, TimerConfig, ViolationTimer};

use crate::{CaptureError, ObjectFeed, ObjectObservation};

/// Object watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectWatcherConfig {
    /// Labels that count as violations (case-insensitive)
    pub prohibited: Vec<String>,
    /// Detections below this confidence are ignored
    pub min_confidence: f64,
    pub timer: TimerConfig,
}

impl Default for ObjectWatcherConfig {
    fn default() -> Self {
        Self {
            prohibited: vec!["Chit".to_string(), "Phone".to_string(), "Earbuds".to_string()],
            min_confidence: 0.3,
            timer: TimerConfig::object(),
        }
    }
}

impl ObjectWatcherConfig {
    /// Configured name of a prohibited label
    fn prohibited_name(&self, label: &str) -> Option<&str> {
        self.prohibited
            .iter()
            .find(|p| p.eq_ignore_ascii_case(label))
            .map(String::as_str)
    }
}

/// Per-process object watching context
#[derive(Debug)]
pub struct ObjectWatcher {
    config: ObjectWatcherConfig,
    timer: ViolationTimer<LabelSet>,
    frames: u64,
}

impl ObjectWatcher {
    pub fn new(config: ObjectWatcherConfig) -> Self {
        info!("Object watcher prohibited list: {:?}", config.prohibited);
        Self {
            timer: ViolationTimer::new(Source::Object, config.timer.clone()),
            config,
            frames: 0,
        }
    }

    /// Run until the feed ends
    pub fn run<F, E>(&mut self, feed: &mut F, mut emit: E) -> Result<(), CaptureError>
    where
        F: ObjectFeed,
        E: FnMut(ObjectRecord),
    {
        info!("Object watcher started");
        loop {
            match feed.next_observation() {
                Ok(obs) => emit(self.process(obs, Instant::now())),
                Err(CaptureError::EndOfStream) => {
                    info!("Object input ended after {} frames", self.frames);
                    return Ok(());
                }
                Err(e) => {
                    error!("Object acquisition failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Turn one observation into a telemetry record
    pub fn process(&mut self, obs: ObjectObservation, now: Instant) -> ObjectRecord {
        self.frames += 1;

        let mut detected_objects = Vec::new();
        let mut prohibited = LabelSet::new();
        let mut detection_confidence: f64 = 0.0;

        for detection in obs
            .detections
            .iter()
            .filter(|d| d.confidence >= self.config.min_confidence)
        {
            if !detected_objects.contains(&detection.label) {
                detected_objects.push(detection.label.clone());
            }
            if let Some(name) = self.config.prohibited_name(&detection.label) {
                prohibited.insert(name);
                detection_confidence = detection_confidence.max(detection.confidence);
            }
        }

        if !prohibited.is_empty() {
            debug!("Prohibited objects in frame: {}", prohibited);
        }

        let prohibited_objects: Vec<String> = prohibited.iter().cloned().collect();
        let outcome = self
            .timer
            .update(prohibited.into_kind(), detection_confidence, now);

        ObjectRecord {
            timestamp_ms: obs.timestamp_ms,
            detected_objects,
            object_violation: !prohibited_objects.is_empty(),
            prohibited_objects,
            violation_duration: self.timer.elapsed(now).as_secs_f64(),
            violation_triggered: self.timer.alert_fired(),
            violation_count: self.timer.count(),
            inference_time: obs.inference_time_ms.max(0.0),
            new_violation: outcome.fired().is_some(),
            detection_confidence: detection_confidence.clamp(0.0, 1.0),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for ObjectWatcher {
    fn default() -> Self {
        Self::new(ObjectWatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Detection;
    use std::time::Duration;

    fn observation(labels: &[(&str, f64)]) -> ObjectObservation {
        ObjectObservation {
            timestamp_ms: 0,
            detections: labels
                .iter()
                .map(|(label, confidence)| Detection {
                    label: label.to_string(),
                    confidence: *confidence,
                })
                .collect(),
            inference_time_ms: 15.0,
        }
    }

    #[test]
    fn test_low_confidence_ignored() {
        let mut watcher = ObjectWatcher::default();
        let record = watcher.process(observation(&[("Phone", 0.2), ("Person", 0.9)]), Instant::now());
        assert_eq!(record.detected_objects, vec!["Person".to_string()]);
        assert!(record.prohibited_objects.is_empty());
        assert!(!record.object_violation);
    }

    #[test]
    fn test_prohibited_fires_after_three_seconds() {
        let mut watcher = ObjectWatcher::default();
        let t0 = Instant::now();

        let mut fired = 0;
        for i in 0..40u64 {
            let record = watcher.process(
                observation(&[("phone", 0.8)]),
                t0 + Duration::from_millis(i * 100),
            );
            assert_eq!(record.prohibited_objects, vec!["Phone".to_string()]);
            if record.new_violation {
                fired += 1;
                assert!(record.violation_duration >= 3.0);
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_label_set_change_restarts_episode() {
        let mut watcher = ObjectWatcher::default();
        let t0 = Instant::now();
        watcher.process(observation(&[("Phone", 0.8)]), t0);
        watcher.process(observation(&[("Phone", 0.8), ("Chit", 0.6)]), t0 + Duration::from_secs(2));

        let record = watcher.process(
            observation(&[("Chit", 0.6), ("Phone", 0.9)]),
            t0 + Duration::from_secs(4),
        );
        assert!(!record.new_violation);
        assert!((record.violation_duration - 2.0).abs() < 1e-9);
        assert_eq!(
            record.prohibited_objects,
            vec!["Chit".to_string(), "Phone".to_string()]
        );
        assert!((record.detection_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_custom_prohibited_list() {
        let mut watcher = ObjectWatcher::new(ObjectWatcherConfig {
            prohibited: vec!["Calculator".to_string()],
            ..Default::default()
        });
        let record = watcher.process(observation(&[("Phone", 0.9), ("calculator", 0.5)]), Instant::now());
        assert_eq!(record.prohibited_objects, vec!["Calculator".to_string()]);
    }
}
