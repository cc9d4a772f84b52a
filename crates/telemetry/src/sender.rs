//! Blocking telemetry sender for detector loops
//!
//! Connects lazily and reconnects after a backoff. Records that cannot be
//! delivered are dropped; the detector loop never blocks on the aggregator.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{encode_frame, TelemetryError, TelemetryRecord};

/// Sender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Wait after a failure before reconnecting
    pub retry_backoff_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self::face()
    }
}

impl SenderConfig {
    pub fn face() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::FACE_PORT,
            connect_timeout_ms: 500,
            write_timeout_ms: 500,
            retry_backoff_ms: 2000,
        }
    }

    pub fn object() -> Self {
        Self {
            port: crate::OBJECT_PORT,
            ..Self::face()
        }
    }
}

/// Length-prefixed record sender
#[derive(Debug)]
pub struct TelemetrySender {
    config: SenderConfig,
    stream: Option<TcpStream>,
    retry_at: Option<Instant>,
    sent: u64,
    dropped: u64,
}

impl TelemetrySender {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            stream: None,
            retry_at: None,
            sent: 0,
            dropped: 0,
        }
    }

    /// Send one record; on failure the record is dropped
    pub fn send<T: TelemetryRecord>(&mut self, record: &T) -> Result<(), TelemetryError> {
        let frame = encode_frame(record)?;
        let result = self.connected().and_then(|stream| {
            stream.write_all(&frame)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) => {
                self.dropped += 1;
                if !matches!(e, TelemetryError::Backoff(_)) {
                    warn!("{} telemetry send failed: {}", T::KIND, e);
                    self.stream = None;
                    self.retry_at =
                        Some(Instant::now() + Duration::from_millis(self.config.retry_backoff_ms));
                }
                Err(e)
            }
        }
    }

    fn connected(&mut self) -> Result<&mut TcpStream, TelemetryError> {
        if self.stream.is_none() {
            if let Some(retry_at) = self.retry_at {
                let now = Instant::now();
                if now < retry_at {
                    return Err(TelemetryError::Backoff(
                        retry_at.duration_since(now).as_millis() as u64,
                    ));
                }
            }
            self.stream = Some(self.connect()?);
            self.retry_at = None;
        }

        self.stream
            .as_mut()
            .ok_or_else(|| TelemetryError::Io("not connected".to_string()))
    }

    fn connect(&self) -> Result<TcpStream, TelemetryError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TelemetryError::Io(format!("cannot resolve {}", addr)))?;

        let stream =
            TcpStream::connect_timeout(&socket, Duration::from_millis(self.config.connect_timeout_ms))?;
        stream.set_write_timeout(Some(Duration::from_millis(self.config.write_timeout_ms)))?;
        stream.set_nodelay(true)?;
        info!("Telemetry connected to {}", addr);
        Ok(stream)
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Records delivered to the socket
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Records dropped because the aggregator was unreachable
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Drop for TelemetrySender {
    fn drop(&mut self) {
        debug!(
            "Telemetry sender closing ({} sent, {} dropped)",
            self.sent, self.dropped
        );
    }
}
