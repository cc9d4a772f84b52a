//! Telemetry Error Types

use thiserror::Error;

/// Errors raised while framing, sending, or receiving telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Socket or stream failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Body is not a valid record
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// Record parsed but failed validation
    #[error("Invalid record field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Length prefix exceeds the configured limit
    #[error("Frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Stream ended inside a frame body
    #[error("Truncated frame: expected {0} bytes")]
    Truncated(usize),

    /// Sender is waiting before the next reconnect attempt
    #[error("Sender backing off, retry in {0}ms")]
    Backoff(u64),

    /// Listener could not bind
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::Malformed(err.to_string())
    }
}
