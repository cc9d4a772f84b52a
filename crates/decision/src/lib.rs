//! Decision Engine
//!
//! Fuses face and object telemetry into a single cheating verdict:
//! - Violation history over a trailing time window
//! - Weighted rule scoring with a cheating threshold
//! - Edge-triggered transition events
//! - Bounded display event log

mod config;
mod engine;
mod events;
mod history;

pub use config::DecisionConfig;
pub use engine::{DecisionEngine, SourceCounters, Verdict};
pub use events::{DecisionEvent, EventKind, EventLog, Severity};
pub use history::{ViolationEntry, ViolationHistory};
