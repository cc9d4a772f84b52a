//! CheatGuard Agent
//!
//! Aggregator process for a proctoring session:
//! - Telemetry listeners for the face and object detectors
//! - Fixed-tick aggregator feeding the decision engine
//! - Detector process supervisor
//! - HTTP status and control surface

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use decision::DecisionEngine;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::{spawn_listener, FaceRecord, ObjectRecord};
use tokio::sync::{mpsc, Mutex, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod aggregator;
pub mod error;
pub mod input;
pub mod logging;
mod routes;
pub mod settings;
pub mod supervisor;

pub use aggregator::{Aggregator, Drained};
pub use error::AgentError;
pub use input::open_input;
pub use logging::init_logging;
pub use routes::status::{FaceSummary, ObjectSummary, StatusSnapshot};
pub use settings::Settings;
pub use supervisor::{DetectorCommand, SessionStatus, Supervisor, SupervisorConfig};

/// Static agent information
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub version: String,
    pub face_port: u16,
    pub object_port: u16,
    pub window_secs: u64,
    pub cheating_threshold: f64,
}

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<RwLock<DecisionEngine>>,
    pub supervisor: Mutex<Supervisor>,
    pub info: AgentInfo,
    /// Events included in a status snapshot by default
    pub status_events: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<RwLock<DecisionEngine>>,
        supervisor: Supervisor,
        info: AgentInfo,
        status_events: usize,
    ) -> Self {
        Self {
            engine,
            supervisor: Mutex::new(supervisor),
            info,
            status_events,
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route("/api/status", get(routes::status::get_status))
        .route("/api/start", post(routes::control::start))
        .route("/api/stop", post(routes::control::stop))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.info.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Json<AgentInfo> {
    Json(state.info.clone())
}

/// Run the agent until interrupted
pub async fn run(settings: Settings) -> Result<(), AgentError> {
    let (face_tx, face_rx) = mpsc::unbounded_channel::<FaceRecord>();
    let (object_tx, object_rx) = mpsc::unbounded_channel::<ObjectRecord>();

    let face_listener = spawn_listener(settings.face_listener.clone(), face_tx).await?;
    let object_listener = spawn_listener(settings.object_listener.clone(), object_tx).await?;

    let engine = Arc::new(RwLock::new(DecisionEngine::new(settings.decision.clone())));
    let aggregator = Aggregator::new(
        Arc::clone(&engine),
        face_rx,
        object_rx,
        Duration::from_millis(settings.tick_ms),
    );
    let aggregator_task = tokio::spawn(aggregator.run());

    let info = AgentInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        face_port: face_listener.local_addr().port(),
        object_port: object_listener.local_addr().port(),
        window_secs: settings.decision.window_secs,
        cheating_threshold: settings.decision.cheating_threshold,
    };
    let state = Arc::new(AppState::new(
        engine,
        Supervisor::new(settings.supervisor.clone()),
        info,
        settings.status_events,
    ));
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&settings.http_addr).await?;
    info!("Status API on {}", settings.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.supervisor.lock().await.stop().await;
    aggregator_task.abort();
    face_listener.shutdown();
    object_listener.shutdown();
    info!("Agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
