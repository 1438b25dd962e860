//! Per-connection session state

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::decode::Decoded;
use crate::types::{ConnectionId, HandshakeMessage, SensorMessage};

/// Lifecycle of one connection.
///
/// `Connected → (Handshaked)? → Streaming → Disconnected`. The handshake is
/// optional: transports like MQTT and BLE go straight to streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Handshaked,
    Streaming,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Handshaked => "handshaked",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Statistics for one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStats {
    pub state: ConnectionState,
    pub messages_received: u64,
    /// Wire bytes, before decoding.
    pub bytes_received: u64,
    pub decode_errors: u64,
    pub callback_errors: u64,
    /// Depth frames whose payload had to be truncated to a record boundary.
    pub alignment_corrections: u64,
    pub connected_since: SystemTime,
    /// The device's handshake, once received.
    pub handshake: Option<HandshakeMessage>,
}

impl ConnectionStats {
    fn new() -> Self {
        Self {
            state: ConnectionState::Connected,
            messages_received: 0,
            bytes_received: 0,
            decode_errors: 0,
            callback_errors: 0,
            alignment_corrections: 0,
            connected_since: SystemTime::now(),
            handshake: None,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.connected_since.elapsed().unwrap_or_default()
    }
}

/// One live connection.
///
/// `turn` serialises dispatch for this connection: it is held from decode
/// until the callback returns, so messages reach callbacks in arrival order.
pub(crate) struct Session {
    pub(crate) id: ConnectionId,
    stats: Mutex<ConnectionStats>,
    turn: AsyncMutex<()>,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            stats: Mutex::new(ConnectionStats::new()),
            turn: AsyncMutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Wait for this connection's previous message to finish.
    pub(crate) async fn turn(&self) -> AsyncMutexGuard<'_, ()> {
        self.turn.lock().await
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed and return the final statistics.
    pub(crate) fn close(&self) -> ConnectionStats {
        self.closed.store(true, Ordering::Release);
        let mut stats = self.stats.lock();
        stats.state = ConnectionState::Disconnected;
        stats.clone()
    }

    pub(crate) fn stats(&self) -> ConnectionStats {
        self.stats.lock().clone()
    }

    pub(crate) fn record_message(&self, wire_size: usize, decoded: &Decoded) {
        let mut stats = self.stats.lock();
        stats.messages_received += 1;
        stats.bytes_received += wire_size as u64;

        if decoded.depth_report.is_some_and(|report| report.misaligned()) {
            stats.alignment_corrections += 1;
        }

        match &decoded.message {
            SensorMessage::Handshake(handshake) => {
                stats.handshake = Some(handshake.clone());
                if stats.state == ConnectionState::Connected {
                    stats.state = ConnectionState::Handshaked;
                }
            }
            _ => {
                if matches!(stats.state, ConnectionState::Connected | ConnectionState::Handshaked) {
                    stats.state = ConnectionState::Streaming;
                }
            }
        }
    }

    pub(crate) fn record_decode_error(&self, wire_size: usize) {
        let mut stats = self.stats.lock();
        stats.messages_received += 1;
        stats.bytes_received += wire_size as u64;
        stats.decode_errors += 1;
    }

    pub(crate) fn record_callback_error(&self) {
        self.stats.lock().callback_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DepthDecodeReport;
    use crate::types::{DepthFormat, DepthFrame, StatusMessage};
    use bytes::Bytes;

    fn status() -> Decoded {
        SensorMessage::Status(StatusMessage::default()).into()
    }

    #[test]
    fn handshake_then_streaming() {
        let session = Session::new(ConnectionId::from("c"));
        assert_eq!(session.stats().state, ConnectionState::Connected);

        session.record_message(10, &SensorMessage::Handshake(HandshakeMessage::default()).into());
        assert_eq!(session.stats().state, ConnectionState::Handshaked);
        assert!(session.stats().handshake.is_some());

        session.record_message(20, &status());
        let stats = session.stats();
        assert_eq!(stats.state, ConnectionState::Streaming);
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.bytes_received, 30);
    }

    #[test]
    fn streaming_without_handshake() {
        let session = Session::new(ConnectionId::from("mqtt-client"));
        session.record_message(5, &status());
        assert_eq!(session.stats().state, ConnectionState::Streaming);
        assert!(session.stats().handshake.is_none());
    }

    #[test]
    fn close_is_terminal() {
        let session = Session::new(ConnectionId::from("c"));
        let stats = session.close();
        assert!(session.is_closed());
        assert_eq!(stats.state, ConnectionState::Disconnected);

        session.record_message(1, &status());
        assert_eq!(session.stats().state, ConnectionState::Disconnected);
    }

    #[test]
    fn misaligned_depth_frames_are_counted() {
        let session = Session::new(ConnectionId::from("c"));
        let frame = DepthFrame {
            timestamp_ns: 0,
            point_count: 2,
            min_depth: 0.0,
            max_depth: 1.0,
            format: DepthFormat::PointCloud,
            data: Bytes::from(vec![0u8; 30]),
        };
        let decoded = Decoded {
            message: SensorMessage::Depth(frame),
            depth_report: Some(DepthDecodeReport {
                declared_count: 2,
                usable_records: 2,
                trailing_bytes_discarded: 1,
                ..Default::default()
            }),
        };

        session.record_message(35, &decoded);
        session.record_decode_error(7);
        let stats = session.stats();
        assert_eq!(stats.alignment_corrections, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.bytes_received, 42);
    }
}
