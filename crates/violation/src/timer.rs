//! Violation debounce timer

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{Source, ViolationEvent};

/// Timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Time a violation must persist before firing (seconds)
    pub threshold_secs: f64,
    /// Episodes longer than this are logged when they end (seconds)
    pub significant_secs: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::face()
    }
}

impl TimerConfig {
    /// Face-side defaults (5 s)
    pub fn face() -> Self {
        Self {
            threshold_secs: 5.0,
            significant_secs: 2.0,
        }
    }

    /// Object-side defaults (3 s)
    pub fn object() -> Self {
        Self {
            threshold_secs: 3.0,
            ..Self::face()
        }
    }

    /// Create strict config (half the threshold)
    pub fn strict(self) -> Self {
        Self {
            threshold_secs: self.threshold_secs / 2.0,
            ..self
        }
    }

    /// Create lenient config (double the threshold)
    pub fn lenient(self) -> Self {
        Self {
            threshold_secs: self.threshold_secs * 2.0,
            ..self
        }
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_secs_f64(self.threshold_secs.max(0.0))
    }

    pub fn significant(&self) -> Duration {
        Duration::from_secs_f64(self.significant_secs.max(0.0))
    }
}

/// Result of one timer update
#[derive(Debug, Clone, PartialEq)]
pub enum TimerOutcome {
    /// No violation, none in progress
    Idle,
    /// A new episode started (or the kind changed)
    Started,
    /// Episode in progress
    Holding { elapsed: Duration, fired: bool },
    /// Episode crossed the threshold on this tick
    Fired(ViolationEvent),
    /// Episode ended
    Cleared { elapsed: Duration, significant: bool },
}

impl TimerOutcome {
    pub fn fired(&self) -> Option<&ViolationEvent> {
        match self {
            TimerOutcome::Fired(event) => Some(event),
            _ => None,
        }
    }
}

/// Per-source debounce state machine
///
/// `none -> K` starts an episode, `K -> K` fires once the threshold is
/// reached, `K -> J` restarts, `K -> none` clears.
#[derive(Debug, Clone)]
pub struct ViolationTimer<K> {
    source: Source,
    config: TimerConfig,
    current: Option<K>,
    started_at: Option<Instant>,
    alert_fired: bool,
    count: u32,
}

impl<K> ViolationTimer<K>
where
    K: PartialEq + Clone + fmt::Display,
{
    pub fn new(source: Source, config: TimerConfig) -> Self {
        Self {
            source,
            config,
            current: None,
            started_at: None,
            alert_fired: false,
            count: 0,
        }
    }

    /// Feed this tick's violation kind (or none)
    pub fn update(&mut self, kind: Option<K>, confidence: f64, now: Instant) -> TimerOutcome {
        match (kind, self.current.take()) {
            (None, None) => TimerOutcome::Idle,

            (None, Some(previous)) => {
                let elapsed = self.elapsed(now);
                let significant = elapsed > self.config.significant();
                if significant {
                    info!(
                        "{} returned to normal after {:.1}s of {}",
                        self.source,
                        elapsed.as_secs_f64(),
                        previous
                    );
                }
                self.started_at = None;
                self.alert_fired = false;
                TimerOutcome::Cleared {
                    elapsed,
                    significant,
                }
            }

            (Some(kind), Some(previous)) if kind == previous => {
                self.current = Some(kind);
                let elapsed = self.elapsed(now);

                if self.alert_fired || elapsed < self.config.threshold() {
                    return TimerOutcome::Holding {
                        elapsed,
                        fired: self.alert_fired,
                    };
                }

                self.alert_fired = true;
                self.count += 1;
                let event = ViolationEvent {
                    source: self.source,
                    kind: previous.to_string(),
                    duration_secs: elapsed.as_secs_f64(),
                    confidence,
                    timestamp: Utc::now(),
                };
                warn!(
                    "{} violation: {} for {:.1}s (confidence {:.2}, count {})",
                    self.source, event.kind, event.duration_secs, confidence, self.count
                );
                TimerOutcome::Fired(event)
            }

            (Some(kind), _) => {
                debug!("{} violation started: {}", self.source, kind);
                self.current = Some(kind);
                self.started_at = Some(now);
                self.alert_fired = false;
                TimerOutcome::Started
            }
        }
    }

    /// Time since the current episode started
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .and_then(|start| now.checked_duration_since(start))
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Alert already fired for the current episode
    pub fn alert_fired(&self) -> bool {
        self.alert_fired
    }

    /// Episodes fired since creation
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Drop the current episode without logging
    pub fn reset(&mut self) {
        self.current = None;
        self.started_at = None;
        self.alert_fired = false;
    }
}
