//! Detector Telemetry
//!
//! Structured records shipped from detector processes to the aggregator
//! over TCP. Each frame is a 4-byte big-endian length followed by a JSON
//! record body.

mod codec;
mod error;
mod listener;
mod record;
mod sender;

pub use codec::{decode_record, encode_frame, read_frame, MAX_FRAME_LEN};
pub use error::TelemetryError;
pub use listener::{spawn_listener, ListenerConfig, ListenerHandle, ListenerStats};
pub use record::{FaceRecord, ObjectRecord, RecordKind, TelemetryRecord};
pub use sender::{SenderConfig, TelemetrySender};

/// Default face telemetry port
pub const FACE_PORT: u16 = 9020;

/// Default object telemetry port
pub const OBJECT_PORT: u16 = 9021;

/// Default bind/connect host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
