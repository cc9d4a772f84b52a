//! Eye-movement pattern analysis
//!
//! Sliding window over the reference point, scoring deviation from the
//! frame center, velocity, and horizontal scanning.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

use crate::{PatternConfig, Point};

/// Samples used for the scanning variance check
const SCAN_SAMPLES: usize = 5;

/// Samples that must all be off-center for a sustained look
const SUSTAINED_SAMPLES: usize = 3;

/// Classified movement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Normal,
    HighDeviation,
    RapidMovement,
    ScanningPattern,
    SustainedOffCenter,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Normal => "normal",
            MovementType::HighDeviation => "high_deviation",
            MovementType::RapidMovement => "rapid_movement",
            MovementType::ScanningPattern => "scanning_pattern",
            MovementType::SustainedOffCenter => "sustained_off_center",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of analyzing one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementAssessment {
    pub suspicious: bool,
    pub movement: MovementType,
    pub confidence: f64,
    /// Distance from the previous sample
    pub velocity: f64,
}

impl MovementAssessment {
    fn normal(velocity: f64) -> Self {
        Self {
            suspicious: false,
            movement: MovementType::Normal,
            confidence: 0.0,
            velocity,
        }
    }
}

/// Sliding-window movement analyzer
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    config: PatternConfig,
    history: VecDeque<Point>,
    suspicious_count: u32,
}

impl PatternAnalyzer {
    pub fn new(config: PatternConfig) -> Self {
        let window = config.window.max(SUSTAINED_SAMPLES);
        Self {
            config: PatternConfig { window, ..config },
            history: VecDeque::with_capacity(window),
            suspicious_count: 0,
        }
    }

    /// Add a sample and score it
    ///
    /// Scoring requires at least two earlier samples in the window. All rules
    /// are evaluated and the highest-confidence one is reported.
    pub fn analyze(&mut self, point: Point, frame_center: Point) -> MovementAssessment {
        let previous = self.history.back().copied();
        let prior = self.history.len();

        self.history.push_back(point);
        while self.history.len() > self.config.window {
            self.history.pop_front();
        }

        let Some(previous) = previous.filter(|_| prior >= 2) else {
            return MovementAssessment::normal(0.0);
        };

        let velocity = point.distance(&previous);
        let dx = (point.x - frame_center.x).abs();
        let dy = (point.y - frame_center.y).abs();
        let threshold = self.config.deviation_threshold;

        let mut candidates: Vec<(MovementType, f64)> = Vec::with_capacity(4);

        if dx > threshold || dy > threshold {
            candidates.push((MovementType::HighDeviation, ((dx + dy) / 100.0).min(0.9)));
        }

        if velocity > self.config.rapid_velocity {
            candidates.push((MovementType::RapidMovement, (velocity / 50.0).min(0.8)));
        }

        if self.history.len() >= SCAN_SAMPLES {
            let (var_x, var_y) = self.recent_variance(SCAN_SAMPLES);
            if var_x > self.config.scan_variance_x && var_y < self.config.scan_variance_y {
                candidates.push((MovementType::ScanningPattern, 0.7));
            }
        }

        if dx > threshold * 0.7
            && self
                .history
                .iter()
                .rev()
                .take(SUSTAINED_SAMPLES)
                .all(|p| (p.x - frame_center.x).abs() > threshold * 0.5)
        {
            candidates.push((MovementType::SustainedOffCenter, 0.8));
        }

        let best = candidates
            .into_iter()
            .fold(None::<(MovementType, f64)>, |best, c| match best {
                Some(b) if b.1 >= c.1 => Some(b),
                _ => Some(c),
            });

        match best {
            Some((movement, confidence)) => {
                self.suspicious_count += 1;
                debug!(
                    "Suspicious movement {} (confidence {:.2}, velocity {:.1})",
                    movement, confidence, velocity
                );
                if self.suspicious_count > self.config.warn_after {
                    warn!(
                        "Repeated suspicious eye movement: {} events, latest {}",
                        self.suspicious_count, movement
                    );
                }
                MovementAssessment {
                    suspicious: true,
                    movement,
                    confidence,
                    velocity,
                }
            }
            None => MovementAssessment::normal(velocity),
        }
    }

    /// Population variance of the last `n` samples on each axis
    fn recent_variance(&self, n: usize) -> (f64, f64) {
        let recent: Vec<&Point> = self.history.iter().rev().take(n).collect();
        let count = recent.len() as f64;
        let mean_x = recent.iter().map(|p| p.x).sum::<f64>() / count;
        let mean_y = recent.iter().map(|p| p.y).sum::<f64>() / count;
        let var_x = recent.iter().map(|p| (p.x - mean_x).powi(2)).sum::<f64>() / count;
        let var_y = recent.iter().map(|p| (p.y - mean_y).powi(2)).sum::<f64>() / count;
        (var_x, var_y)
    }

    pub fn suspicious_count(&self) -> u32 {
        self.suspicious_count
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.suspicious_count = 0;
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}
