//! Async telemetry listener
//!
//! One listener per source. Every accepted connection runs in its own task
//! and forwards validated records to the source queue.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{decode_record, read_frame, TelemetryError, TelemetryRecord, MAX_FRAME_LEN};

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
    pub max_frame_len: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::face()
    }
}

impl ListenerConfig {
    pub fn face() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::FACE_PORT,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    pub fn object() -> Self {
        Self {
            port: crate::OBJECT_PORT,
            ..Self::face()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Listener counters
#[derive(Debug, Default)]
pub struct ListenerStats {
    connections: AtomicU64,
    records: AtomicU64,
    malformed: AtomicU64,
}

impl ListenerStats {
    /// Connections accepted
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Records accepted and queued
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Frames dropped as malformed client data
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// Handle to a running listener
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stats: Arc<ListenerStats>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Stop accepting new connections
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind a listener and start accepting connections
pub async fn spawn_listener<T: TelemetryRecord>(
    config: ListenerConfig,
    queue: UnboundedSender<T>,
) -> Result<ListenerHandle, TelemetryError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| TelemetryError::Bind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
    let local_addr = listener.local_addr()?;
    info!("{} telemetry listener on {}", T::KIND, local_addr);

    let stats = Arc::new(ListenerStats::default());
    let task = tokio::spawn(accept_loop(
        listener,
        queue,
        Arc::clone(&stats),
        config.max_frame_len,
    ));

    Ok(ListenerHandle {
        local_addr,
        stats,
        task,
    })
}

async fn accept_loop<T: TelemetryRecord>(
    listener: TcpListener,
    queue: UnboundedSender<T>,
    stats: Arc<ListenerStats>,
    max_frame_len: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                stats.connections.fetch_add(1, Ordering::Relaxed);
                debug!("{} telemetry connection from {}", T::KIND, peer);
                tokio::spawn(handle_connection(
                    stream,
                    peer,
                    queue.clone(),
                    Arc::clone(&stats),
                    max_frame_len,
                ));
            }
            Err(e) => warn!("{} telemetry accept failed: {}", T::KIND, e),
        }
    }
}

async fn handle_connection<T: TelemetryRecord>(
    stream: TcpStream,
    peer: SocketAddr,
    queue: UnboundedSender<T>,
    stats: Arc<ListenerStats>,
    max_frame_len: usize,
) {
    let mut reader = BufReader::new(stream);

    loop {
        let body = match read_frame(&mut reader, max_frame_len).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("{} telemetry connection from {} closed", T::KIND, peer);
                return;
            }
            Err(TelemetryError::Truncated(len)) => {
                debug!("{} dropped partial frame ({} bytes) from {}", T::KIND, len, peer);
                return;
            }
            Err(e) => {
                record_malformed(&stats, T::KIND.to_string());
                warn!("{} telemetry connection from {} dropped: {}", T::KIND, peer, e);
                return;
            }
        };

        match decode_record::<T>(&body) {
            Ok(record) => {
                stats.records.fetch_add(1, Ordering::Relaxed);
                if queue.send(record).is_err() {
                    debug!("{} queue closed, dropping connection from {}", T::KIND, peer);
                    return;
                }
            }
            Err(e) => {
                record_malformed(&stats, T::KIND.to_string());
                debug!("{} malformed record from {}: {}", T::KIND, peer, e);
            }
        }
    }
}

fn record_malformed(stats: &ListenerStats, source: String) {
    stats.malformed.fetch_add(1, Ordering::Relaxed);
    metrics::counter!("telemetry_malformed_total", "source" => source).increment(1);
}
