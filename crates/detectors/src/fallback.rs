//! Landmark fallback for transient face loss and poor detections

use tracing::debug;

use crate::FaceLandmarks;

/// Default number of frames the last landmarks are reused
pub const DEFAULT_FALLBACK_FRAMES: u32 = 10;

/// Detections at or below this quality are treated like a missed face
pub const MIN_FACE_QUALITY: f64 = 0.3;

/// Reuses the last valid landmark set for a bounded number of frames
#[derive(Debug, Clone)]
pub struct LandmarkFallback {
    limit: u32,
    min_quality: f64,
    last: Option<FaceLandmarks>,
    misses: u32,
}

impl LandmarkFallback {
    pub fn new(limit: u32, min_quality: f64) -> Self {
        Self {
            limit,
            min_quality,
            last: None,
            misses: 0,
        }
    }

    /// Landmarks to use for a `width` x `height` frame
    ///
    /// Fresh landmarks of acceptable quality replace the stored set. Without
    /// fresh landmarks the stored set is returned until `limit` consecutive
    /// misses. Poor-quality landmarks count as a miss while a stored set is
    /// still usable; otherwise they are taken as they are.
    pub fn resolve(
        &mut self,
        fresh: Option<FaceLandmarks>,
        width: u32,
        height: u32,
    ) -> Option<&FaceLandmarks> {
        match fresh {
            Some(landmarks) => {
                let quality = landmarks.quality(width, height);
                let poor = quality.is_some_and(|q| q <= self.min_quality);
                if poor && self.last.is_some() && self.misses < self.limit {
                    self.misses += 1;
                    debug!(
                        "Poor face quality ({:.2}), reusing landmarks ({}/{})",
                        quality.unwrap_or_default(),
                        self.misses,
                        self.limit
                    );
                } else {
                    self.last = Some(landmarks);
                    self.misses = 0;
                }
            }
            None => {
                self.misses = self.misses.saturating_add(1);
                if self.misses > self.limit {
                    return None;
                }
                debug!("No face, reusing landmarks ({}/{})", self.misses, self.limit);
            }
        }
        self.last.as_ref()
    }

    /// Consecutive frames without a face
    pub fn misses(&self) -> u32 {
        self.misses
    }
}

impl Default for LandmarkFallback {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_FRAMES, MIN_FACE_QUALITY)
    }
}
