//! Fixed-tick aggregator
//!
//! Drains the face and object queues into the decision engine and
//! re-evaluates the verdict on every tick. Never waits on detectors.

use decision::{DecisionEngine, DecisionEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::{FaceRecord, ObjectRecord};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Records moved into the engine by one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub face: usize,
    pub object: usize,
}

/// Queue consumer feeding the shared decision engine
pub struct Aggregator {
    engine: Arc<RwLock<DecisionEngine>>,
    face_rx: UnboundedReceiver<FaceRecord>,
    object_rx: UnboundedReceiver<ObjectRecord>,
    tick: Duration,
}

impl Aggregator {
    pub fn new(
        engine: Arc<RwLock<DecisionEngine>>,
        face_rx: UnboundedReceiver<FaceRecord>,
        object_rx: UnboundedReceiver<ObjectRecord>,
        tick: Duration,
    ) -> Self {
        Self {
            engine,
            face_rx,
            object_rx,
            tick: tick.max(Duration::from_millis(1)),
        }
    }

    /// Drain both queues and evaluate once
    pub async fn step(&mut self) -> (Drained, Option<DecisionEvent>) {
        let now = Instant::now();
        let mut engine = self.engine.write().await;
        let mut drained = Drained::default();

        while let Ok(record) = self.face_rx.try_recv() {
            engine.ingest_face(record, now);
            drained.face += 1;
        }
        while let Ok(record) = self.object_rx.try_recv() {
            engine.ingest_object(record, now);
            drained.object += 1;
        }

        if drained.face + drained.object > 0 {
            metrics::counter!("aggregator_records_total", "source" => "face")
                .increment(drained.face as u64);
            metrics::counter!("aggregator_records_total", "source" => "object")
                .increment(drained.object as u64);
        }

        (drained, engine.tick(now))
    }

    /// Run until the task is cancelled
    pub async fn run(mut self) {
        info!("Aggregator running every {:?}", self.tick);
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let (drained, event) = self.step().await;
            if drained.face + drained.object > 0 {
                debug!(
                    "Drained {} face and {} object records",
                    drained.face, drained.object
                );
            }
            if let Some(event) = event {
                debug!("Verdict transition: {}", event.message);
            }
        }
    }
}
