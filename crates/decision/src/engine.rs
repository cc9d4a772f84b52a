//! Weighted decision engine

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info};

use telemetry::{FaceRecord, ObjectRecord};
use violation::Source;

use crate::{
    DecisionConfig, DecisionEvent, EventKind, EventLog, Severity, ViolationHistory,
};

/// Current verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_cheating: bool,
    /// Weighted confidence in [0, 1]
    pub confidence: f64,
    pub reason: String,
    pub recent_face: usize,
    pub recent_object: usize,
    pub recent_total: usize,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl Default for Verdict {
    fn default() -> Self {
        Self {
            is_cheating: false,
            confidence: 0.0,
            reason: "No violations detected".to_string(),
            recent_face: 0,
            recent_object: 0,
            recent_total: 0,
            evaluated_at: None,
        }
    }
}

/// Per-source record counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceCounters {
    pub face_records: u64,
    pub object_records: u64,
    pub face_violations: u64,
    pub object_violations: u64,
    pub last_face_at: Option<DateTime<Utc>>,
    pub last_object_at: Option<DateTime<Utc>>,
}

/// Time-windowed multi-rule confidence scorer
///
/// Face records count when `flagged` is set, object records when
/// `new_violation` is set. Each rule contributes its weight once its count
/// threshold is met, regardless of how far the count exceeds it.
#[derive(Debug)]
pub struct DecisionEngine {
    config: DecisionConfig,
    history: ViolationHistory,
    log: EventLog,
    verdict: Verdict,
    counters: SourceCounters,
    last_face: Option<FaceRecord>,
    last_object: Option<ObjectRecord>,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        info!(
            "Decision engine: {}s window, cheating at {:.0}%",
            config.window_secs,
            config.cheating_threshold * 100.0
        );
        Self {
            history: ViolationHistory::new(config.window()),
            log: EventLog::new(config.event_log_capacity),
            verdict: Verdict::default(),
            counters: SourceCounters::default(),
            last_face: None,
            last_object: None,
            config,
        }
    }

    /// Accept a face tracker record
    pub fn ingest_face(&mut self, record: FaceRecord, now: Instant) {
        self.counters.face_records += 1;
        self.counters.last_face_at = Some(Utc::now());

        if record.flagged {
            let details = format!(
                "{} for {:.1}s",
                record.gaze_direction, record.violation_duration
            );
            info!("Gaze violation recorded: {}", details);
            self.counters.face_violations += 1;
            self.log.push(DecisionEvent::new(
                EventKind::GazeViolation,
                Severity::Warning,
                format!("Gaze violation: {}", details),
            ));
            self.history.record(Source::Face, details, now);
        }

        self.last_face = Some(record);
    }

    /// Accept an object watcher record
    pub fn ingest_object(&mut self, record: ObjectRecord, now: Instant) {
        self.counters.object_records += 1;
        self.counters.last_object_at = Some(Utc::now());

        if record.new_violation {
            let details = record.prohibited_objects.join(", ");
            info!("Prohibited object recorded: {}", details);
            self.counters.object_violations += 1;
            self.log.push(DecisionEvent::new(
                EventKind::ObjectViolation,
                Severity::Warning,
                format!("Prohibited object: {}", details),
            ));
            self.history.record(Source::Object, details, now);
        }

        self.last_object = Some(record);
    }

    /// Re-evaluate the verdict; returns a transition event if the verdict flipped
    pub fn tick(&mut self, now: Instant) -> Option<DecisionEvent> {
        self.history.prune(now);

        let recent_face = self.history.recent(Source::Face, now);
        let recent_object = self.history.recent(Source::Object, now);
        let recent_total = self.history.recent_total(now);

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        if recent_face >= self.config.face_threshold {
            confidence += self.config.face_weight;
            reasons.push(format!("{} gaze violations", recent_face));
        }
        if recent_object >= self.config.object_threshold {
            confidence += self.config.object_weight;
            reasons.push(format!("{} prohibited object(s)", recent_object));
        }
        if recent_total >= self.config.total_threshold {
            confidence += self.config.total_weight;
            reasons.push(format!("suspicious pattern ({} total)", recent_total));
        }

        let confidence: f64 = confidence.min(1.0);
        let reason = if reasons.is_empty() {
            "No violations detected".to_string()
        } else {
            reasons.join(" + ")
        };
        let is_cheating = confidence >= self.config.cheating_threshold - f64::EPSILON;
        let was_cheating = self.verdict.is_cheating;

        self.verdict = Verdict {
            is_cheating,
            confidence,
            reason,
            recent_face,
            recent_object,
            recent_total,
            evaluated_at: Some(Utc::now()),
        };

        let event = match (was_cheating, is_cheating) {
            (false, true) => {
                let percent = (confidence * 100.0).round() as u32;
                error!(
                    "CHEATING DETECTED: {} (confidence {}%)",
                    self.verdict.reason, percent
                );
                Some(DecisionEvent::new(
                    EventKind::CheatingDetected,
                    Severity::Critical,
                    format!(
                        "Cheating detected: {} (confidence {}%)",
                        self.verdict.reason, percent
                    ),
                ))
            }
            (true, false) => {
                info!("Cheating status cleared");
                Some(DecisionEvent::new(
                    EventKind::StatusCleared,
                    Severity::Info,
                    "Status cleared: no sustained violations in window",
                ))
            }
            _ => None,
        };

        if let Some(event) = &event {
            self.log.push(event.clone());
        } else {
            debug!(
                "Verdict unchanged ({:.2}, face {}, object {})",
                confidence, recent_face, recent_object
            );
        }
        event
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    pub fn counters(&self) -> &SourceCounters {
        &self.counters
    }

    pub fn history(&self) -> &ViolationHistory {
        &self.history
    }

    /// Up to `n` most recent log events
    pub fn recent_events(&self, n: usize) -> Vec<DecisionEvent> {
        self.log.latest(n)
    }

    pub fn last_face(&self) -> Option<&FaceRecord> {
        self.last_face.as_ref()
    }

    pub fn last_object(&self) -> Option<&ObjectRecord> {
        self.last_object.as_ref()
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Clear all session state
    pub fn reset(&mut self) {
        self.history.clear();
        self.log.clear();
        self.verdict = Verdict::default();
        self.counters = SourceCounters::default();
        self.last_face = None;
        self.last_object = None;
        info!("Decision engine reset");
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DecisionConfig::default())
    }
}
