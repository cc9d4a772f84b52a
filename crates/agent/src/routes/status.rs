//! Status Routes

use axum::{
    extract::{Query, State},
    Json,
};
use decision::{DecisionEvent, SourceCounters, Verdict};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telemetry::{FaceRecord, ObjectRecord};
use uuid::Uuid;

use crate::supervisor::{DetectorLiveness, SessionStatus};
use crate::AppState;

/// Query parameters for the status endpoint
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Number of log events to include
    pub events: Option<usize>,
}

/// Latest face tracker record, abridged
#[derive(Debug, Clone, Serialize)]
pub struct FaceSummary {
    pub gaze_direction: String,
    pub head_yaw: f64,
    pub eye_velocity: f64,
    pub flagged: bool,
    pub proctoring_enabled: bool,
    pub total_blinks: u32,
    pub calibration_stale: bool,
}

impl From<&FaceRecord> for FaceSummary {
    fn from(record: &FaceRecord) -> Self {
        Self {
            gaze_direction: record.gaze_direction.clone(),
            head_yaw: record.yaw,
            eye_velocity: record.eye_velocity,
            flagged: record.flagged,
            proctoring_enabled: record.proctoring_enabled,
            total_blinks: record.total_blinks,
            calibration_stale: record.calibration_stale,
        }
    }
}

/// Latest object watcher record, abridged
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    pub detected_objects: Vec<String>,
    pub prohibited_objects: Vec<String>,
    pub inference_time: f64,
    pub violation_active: bool,
}

impl From<&ObjectRecord> for ObjectSummary {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            detected_objects: record.detected_objects.clone(),
            prohibited_objects: record.prohibited_objects.clone(),
            inference_time: record.inference_time,
            violation_active: record.object_violation,
        }
    }
}

/// Pull-based status snapshot
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<Uuid>,
    pub detectors: DetectorLiveness,
    pub verdict: Verdict,
    pub counters: SourceCounters,
    pub face: Option<FaceSummary>,
    pub object: Option<ObjectSummary>,
    pub events: Vec<DecisionEvent>,
}

/// Get the current status snapshot
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusQuery>,
) -> Json<StatusSnapshot> {
    // A start or stop holds the supervisor while it waits on processes
    let (status, detectors, session_id) = match state.supervisor.try_lock() {
        Ok(mut supervisor) => {
            supervisor.reap();
            let liveness = supervisor.liveness();
            (
                liveness.status(),
                liveness,
                supervisor.session().map(|s| s.id),
            )
        }
        Err(_) => (SessionStatus::Busy, DetectorLiveness::default(), None),
    };

    let limit = params.events.unwrap_or(state.status_events).min(50);
    let engine = state.engine.read().await;

    Json(StatusSnapshot {
        status,
        session_id,
        detectors,
        verdict: engine.verdict().clone(),
        counters: engine.counters().clone(),
        face: engine.last_face().map(FaceSummary::from),
        object: engine.last_object().map(ObjectSummary::from),
        events: engine.recent_events(limit),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use crate::supervisor::SupervisorConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Instant;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_idle_snapshot_reports_engine_state() {
        let state = crate::tests::test_state(SupervisorConfig::default());
        {
            let mut engine = state.engine.write().await;
            let now = Instant::now();
            engine.ingest_face(
                FaceRecord {
                    gaze_direction: "left".to_string(),
                    yaw: -31.0,
                    flagged: true,
                    calibration_stale: true,
                    ..Default::default()
                },
                now,
            );
            engine.tick(now);
        }

        let response = create_router(state)
            .oneshot(Request::get("/api/status?events=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let snapshot: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(snapshot["status"], "idle");
        assert!(snapshot["session_id"].is_null());
        assert_eq!(snapshot["verdict"]["is_cheating"], false);
        assert_eq!(snapshot["verdict"]["recent_face"], 1);
        assert_eq!(snapshot["face"]["gaze_direction"], "left");
        assert_eq!(snapshot["face"]["head_yaw"], -31.0);
        assert_eq!(snapshot["face"]["calibration_stale"], true);
        assert!(snapshot["object"].is_null());
        assert_eq!(snapshot["events"].as_array().map(Vec::len), Some(1));
    }
}
