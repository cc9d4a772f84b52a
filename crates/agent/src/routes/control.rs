//! Session Control Routes

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AgentError, AppState};

/// Response for start/stop
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
    pub session_id: Option<Uuid>,
}

/// Start both detectors
pub async fn start(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ControlResponse>) {
    let mut supervisor = state.supervisor.lock().await;

    match supervisor.start().await {
        Ok(session) => (
            StatusCode::OK,
            Json(ControlResponse {
                success: true,
                message: "Proctoring started".to_string(),
                session_id: Some(session.id),
            }),
        ),
        Err(AgentError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(ControlResponse {
                success: false,
                message: "Proctoring is already running".to_string(),
                session_id: supervisor.session().map(|s| s.id),
            }),
        ),
        Err(e) => {
            error!("Start failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ControlResponse {
                    success: false,
                    message: e.to_string(),
                    session_id: None,
                }),
            )
        }
    }
}

/// Stop both detectors and reset the decision state
pub async fn stop(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ControlResponse>) {
    let mut supervisor = state.supervisor.lock().await;
    let session_id = supervisor.session().map(|s| s.id);

    if !supervisor.stop().await {
        return (
            StatusCode::OK,
            Json(ControlResponse {
                success: true,
                message: "Proctoring was not running".to_string(),
                session_id: None,
            }),
        );
    }

    state.engine.write().await.reset();
    info!("Session state cleared");
    (
        StatusCode::OK,
        Json(ControlResponse {
            success: true,
            message: "Proctoring stopped".to_string(),
            session_id,
        }),
    )
}

#[cfg(all(test, unix))]
mod tests {
    use crate::create_router;
    use crate::supervisor::{DetectorCommand, SupervisorConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn sleepers() -> SupervisorConfig {
        SupervisorConfig {
            face: DetectorCommand::new("sleep").arg("30"),
            object: DetectorCommand::new("sleep").arg("30"),
            startup_grace_ms: 100,
            stop_timeout_ms: 2000,
        }
    }

    #[tokio::test]
    async fn test_start_twice_then_stop_twice() {
        let app = create_router(crate::tests::test_state(sleepers()));

        let (status, body) = call(&app, "POST", "/api/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let session_id = body["session_id"].clone();
        assert!(session_id.is_string());

        let (_, snapshot) = call(&app, "GET", "/api/status").await;
        assert_eq!(snapshot["status"], "running");
        assert_eq!(snapshot["session_id"], session_id);

        let (status, body) = call(&app, "POST", "/api/start").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "POST", "/api/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Proctoring stopped");

        let (status, body) = call(&app, "POST", "/api/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Proctoring was not running");

        let (_, snapshot) = call(&app, "GET", "/api/status").await;
        assert_eq!(snapshot["status"], "idle");
    }

    #[tokio::test]
    async fn test_failed_start_reports_error() {
        let mut config = sleepers();
        config.face = DetectorCommand::new("false");
        let app = create_router(crate::tests::test_state(config));

        let (status, body) = call(&app, "POST", "/api/start").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap_or("").contains("face tracker"));
    }
}
