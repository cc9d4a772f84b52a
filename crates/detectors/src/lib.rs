//! Detector Loops
//!
//! Blocking per-frame pipelines that turn external vision collaborator
//! output into telemetry records:
//! - Face tracker (calibration, gaze assessment, blink count, violation timer)
//! - Object watcher (prohibited label filter, violation timer)
//!
//! Vision models and frame acquisition stay behind the traits in
//! [`collaborators`]; JSON-lines feeds let any external model drive the loops.

pub mod blink;
pub mod collaborators;
pub mod face_tracker;
pub mod fallback;
pub mod feed;
pub mod jsonl;
pub mod object_watcher;

pub use blink::{BlinkConfig, BlinkCounter};
pub use collaborators::{
    Detection, FaceLandmarks, Frame, FrameSource, HeadPoseModel, LandmarkModel, ObjectModel,
};
pub use face_tracker::{FaceTracker, FaceTrackerConfig};
pub use fallback::LandmarkFallback;
pub use feed::{
    ControlSignal, FaceEvent, FaceFeed, FaceObservation, ObjectFeed, ObjectObservation,
    VisionFaceFeed, VisionObjectFeed,
};
pub use jsonl::{JsonLinesFaceFeed, JsonLinesObjectFeed};
pub use object_watcher::{ObjectWatcher, ObjectWatcherConfig};

use thiserror::Error;

/// Frame acquisition error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open source: {0}")]
    Open(String),

    #[error("Input stream ended")]
    EndOfStream,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Model failed: {0}")]
    Model(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}
