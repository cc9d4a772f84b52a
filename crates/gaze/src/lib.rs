//! Gaze Monitoring
//!
//! Per-frame examinee gaze analysis:
//! - Acceptable-zone classification against the active calibration
//! - Eye-movement pattern analysis (velocity, variance)
//! - Head pose smoothing and baseline
//! - Composition into a single per-frame face assessment

pub mod assessment;
pub mod classifier;
pub mod config;
pub mod pattern;
pub mod signal;
pub mod smoothing;

pub use assessment::{FaceAssessment, GazeAssessor};
pub use classifier::{classify_zone, Direction, GazeZone, ZoneVerdict};
pub use config::{GazeConfig, PatternConfig};
pub use pattern::{MovementAssessment, MovementType, PatternAnalyzer};
pub use signal::{HeadPose, LiveSignal};
pub use smoothing::{AngleBuffer, HeadPoseSmoother};

pub use calibration::Point;
