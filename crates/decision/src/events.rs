//! Decision events and display log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Sustained gaze violation reported by the face tracker
    GazeViolation,
    /// Sustained prohibited object reported by the object watcher
    ObjectViolation,
    /// Verdict flipped to cheating
    CheatingDetected,
    /// Verdict flipped back to clear
    StatusCleared,
}

/// Entry in the display event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl DecisionEvent {
    pub fn new(kind: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded event log, most recent first
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    events: VecDeque<DecisionEvent>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: DecisionEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// Up to `n` most recent events
    pub fn latest(&self, n: usize) -> Vec<DecisionEvent> {
        self.events.iter().take(n).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecisionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
