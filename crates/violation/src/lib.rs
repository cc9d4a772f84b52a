//! Violation Tracking
//!
//! Debounces per-frame violation signals into sustained episodes and emits
//! exactly one `ViolationEvent` per episode.

mod event;
mod timer;

pub use event::{LabelSet, Source, ViolationEvent};
pub use timer::{TimerConfig, TimerOutcome, ViolationTimer};
