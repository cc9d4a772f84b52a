//! Detector input feeds

use gaze::HeadPose;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;

use crate::{
    CaptureError, Detection, FaceLandmarks, FrameSource, HeadPoseModel, LandmarkModel, ObjectModel,
};

/// Operator control signal for the face tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    StartCalibration,
    ConfirmTarget,
    AbortCalibration,
    /// Store the current head pose as neutral
    Recenter,
    ToggleProctoring,
    Quit,
}

/// Collaborator output for one face frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceObservation {
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    /// Landmarks, `None` when no face was found
    pub landmarks: Option<FaceLandmarks>,
    /// Raw head pose, `None` when the solve failed
    pub head_pose: Option<HeadPose>,
}

/// Collaborator output for one object frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectObservation {
    pub timestamp_ms: u64,
    pub detections: Vec<Detection>,
    pub inference_time_ms: f64,
}

/// Item produced by a face feed
#[derive(Debug, Clone, PartialEq)]
pub enum FaceEvent {
    Frame(FaceObservation),
    Signal(ControlSignal),
}

/// Source of face tracker input
pub trait FaceFeed {
    /// Next event; an error ends the tracker loop
    fn next_event(&mut self) -> Result<FaceEvent, CaptureError>;
}

/// Source of object watcher input
pub trait ObjectFeed {
    /// Next observation; an error ends the watcher loop
    fn next_observation(&mut self) -> Result<ObjectObservation, CaptureError>;
}

/// Face feed backed by a frame source and vision models
pub struct VisionFaceFeed<S, L, P> {
    source: S,
    landmarks: L,
    pose: P,
    signals: Option<Receiver<ControlSignal>>,
}

impl<S, L, P> VisionFaceFeed<S, L, P>
where
    S: FrameSource,
    L: LandmarkModel,
    P: HeadPoseModel,
{
    pub fn new(source: S, landmarks: L, pose: P) -> Self {
        Self {
            source,
            landmarks,
            pose,
            signals: None,
        }
    }

    /// Deliver operator signals (e.g. from a key handler) between frames
    pub fn with_signals(mut self, signals: Receiver<ControlSignal>) -> Self {
        self.signals = Some(signals);
        self
    }
}

impl<S, L, P> FaceFeed for VisionFaceFeed<S, L, P>
where
    S: FrameSource,
    L: LandmarkModel,
    P: HeadPoseModel,
{
    fn next_event(&mut self) -> Result<FaceEvent, CaptureError> {
        if let Some(signal) = self.signals.as_ref().and_then(|rx| rx.try_recv().ok()) {
            return Ok(FaceEvent::Signal(signal));
        }

        let frame = self.source.next_frame()?;
        let landmarks = self.landmarks.landmarks(&frame);
        let head_pose = landmarks
            .as_ref()
            .and_then(|l| self.pose.estimate(l, frame.width, frame.height));

        Ok(FaceEvent::Frame(FaceObservation {
            timestamp_ms: frame.timestamp_ms,
            width: frame.width,
            height: frame.height,
            landmarks,
            head_pose,
        }))
    }
}

/// Object feed backed by a frame source and a detection model
pub struct VisionObjectFeed<S, M> {
    source: S,
    model: M,
}

impl<S: FrameSource, M: ObjectModel> VisionObjectFeed<S, M> {
    pub fn new(source: S, model: M) -> Self {
        Self { source, model }
    }
}

impl<S: FrameSource, M: ObjectModel> ObjectFeed for VisionObjectFeed<S, M> {
    fn next_observation(&mut self) -> Result<ObjectObservation, CaptureError> {
        let frame = self.source.next_frame()?;
        let (detections, inference_time_ms) = self.model.detect(&frame)?;
        Ok(ObjectObservation {
            timestamp_ms: frame.timestamp_ms,
            detections,
            inference_time_ms,
        })
    }
}
