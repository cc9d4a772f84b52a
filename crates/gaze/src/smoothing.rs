//! Head pose smoothing

use std::collections::VecDeque;
use tracing::info;

use crate::HeadPose;

/// Fixed-size moving average over head pose angles
#[derive(Debug, Clone)]
pub struct AngleBuffer {
    window: usize,
    samples: VecDeque<HeadPose>,
}

impl AngleBuffer {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, pose: HeadPose) {
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(pose);
    }

    /// Buffer holds a full window of samples
    pub fn is_warm(&self) -> bool {
        self.samples.len() >= self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Averaged angles once warm, otherwise the most recent raw sample
    pub fn current(&self) -> Option<HeadPose> {
        if !self.is_warm() {
            return self.samples.back().copied();
        }

        let n = self.samples.len() as f64;
        let sum = self.samples.iter().fold(HeadPose::default(), |acc, p| {
            HeadPose::new(acc.pitch + p.pitch, acc.yaw + p.yaw, acc.roll + p.roll)
        });
        Some(HeadPose::new(sum.pitch / n, sum.yaw / n, sum.roll / n))
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Smoothed head pose relative to an optional neutral baseline
#[derive(Debug, Clone)]
pub struct HeadPoseSmoother {
    buffer: AngleBuffer,
    baseline: Option<HeadPose>,
}

impl HeadPoseSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            buffer: AngleBuffer::new(window),
            baseline: None,
        }
    }

    /// Feed this frame's estimate (if any) and return the pose to use.
    ///
    /// Frames without an estimate reuse the last smoothed value.
    pub fn update(&mut self, estimate: Option<HeadPose>) -> Option<HeadPose> {
        if let Some(pose) = estimate {
            self.buffer.push(pose);
        }
        self.current()
    }

    /// Current smoothed pose, baseline-adjusted
    pub fn current(&self) -> Option<HeadPose> {
        let pose = self.buffer.current()?;
        Some(match self.baseline {
            Some(b) => HeadPose::new(pose.pitch - b.pitch, pose.yaw - b.yaw, pose.roll - b.roll),
            None => pose,
        })
    }

    /// Store the current smoothed pose as neutral; returns whether a pose was available
    pub fn recenter(&mut self) -> bool {
        match self.buffer.current() {
            Some(pose) => {
                info!(
                    "Head pose recentered (pitch {:.1}, yaw {:.1}, roll {:.1})",
                    pose.pitch, pose.yaw, pose.roll
                );
                self.baseline = Some(pose);
                true
            }
            None => false,
        }
    }

    pub fn is_warm(&self) -> bool {
        self.buffer.is_warm()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.baseline = None;
    }
}
