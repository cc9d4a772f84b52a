//! Agent error types

use thiserror::Error;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] telemetry::TelemetryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Proctoring is already running")]
    AlreadyRunning,

    #[error("Failed to start {name}: {reason}")]
    SpawnFailed { name: &'static str, reason: String },

    #[error("{name} exited during startup ({status})")]
    DetectorExited { name: &'static str, status: String },
}
