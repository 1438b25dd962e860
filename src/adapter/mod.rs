//! Protocol adapters
//!
//! An adapter owns one transport (WebSocket, MQTT, BLE, ...) and turns its
//! connections and frames into calls on a shared [`Dispatcher`]. Everything
//! protocol-independent (decoding, statistics, callbacks) lives in the
//! dispatcher, so an adapter is only I/O glue.
//!
//! Several adapters may share one dispatcher, e.g. a WebSocket and an MQTT
//! adapter feeding the same callbacks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "websocket")]
//! # async fn example() -> arvos::Result<()> {
//! use arvos::adapter::{Adapter, WebSocketAdapter};
//! use arvos::config::ServerConfig;
//! use arvos::dispatch::Dispatcher;
//! use arvos::types::ImuData;
//!
//! let dispatcher = Dispatcher::builder()
//!     .on::<ImuData, _>(|_, imu| {
//!         println!("gyro z = {:.3}", imu.angular_velocity[2]);
//!         Ok(())
//!     })
//!     .build();
//!
//! let mut adapter = WebSocketAdapter::new(ServerConfig::default(), dispatcher);
//! adapter.start().await?;
//! println!("Connect the app to {}", adapter.connection_url());
//! # Ok(())
//! # }
//! ```
//!
//! [`Dispatcher`]: crate::dispatch::Dispatcher

#[cfg(feature = "websocket")]
mod websocket;

#[cfg(feature = "websocket")]
pub use websocket::WebSocketAdapter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::str::FromStr;

use crate::{ArvosError, Result};

/// Transports the app can stream over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "websocket")]
    WebSocket,
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "grpc")]
    Grpc,
    #[serde(rename = "mqtt")]
    Mqtt,
    #[serde(rename = "ble")]
    Ble,
    #[serde(rename = "mcap_stream", alias = "mcap")]
    McapStream,
    #[serde(rename = "quic", alias = "http3")]
    Quic,
}

impl Protocol {
    pub const ALL: [Protocol; 7] = [
        Protocol::WebSocket,
        Protocol::Http,
        Protocol::Grpc,
        Protocol::Mqtt,
        Protocol::Ble,
        Protocol::McapStream,
        Protocol::Quic,
    ];

    /// Human-readable protocol name.
    pub fn name(self) -> &'static str {
        match self {
            Protocol::WebSocket => "WebSocket",
            Protocol::Http => "HTTP/REST",
            Protocol::Grpc => "gRPC",
            Protocol::Mqtt => "MQTT",
            Protocol::Ble => "Bluetooth LE",
            Protocol::McapStream => "MCAP Stream",
            Protocol::Quic => "QUIC/HTTP3",
        }
    }

    /// Port the app expects when none is configured. BLE has none.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::WebSocket => 9090,
            Protocol::Http => 8080,
            Protocol::Grpc => 50051,
            Protocol::Mqtt => 1883,
            Protocol::Ble => 0,
            Protocol::McapStream => 17500,
            Protocol::Quic => 4433,
        }
    }

    /// The URL to enter in the app.
    pub fn connection_url(self, host: &str, port: u16) -> String {
        match self {
            Protocol::WebSocket | Protocol::McapStream => format!("ws://{}:{}", host, port),
            Protocol::Http => format!("http://{}:{}/api", host, port),
            Protocol::Grpc => format!("grpc://{}:{}", host, port),
            Protocol::Mqtt => format!("mqtt://{}:{}", host, port),
            Protocol::Ble => "ble://arvos".to_string(),
            Protocol::Quic => format!("https://{}:{}/api", host, port),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = ArvosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(Protocol::WebSocket),
            "http" | "rest" | "http/rest" => Ok(Protocol::Http),
            "grpc" => Ok(Protocol::Grpc),
            "mqtt" => Ok(Protocol::Mqtt),
            "ble" | "bluetooth" => Ok(Protocol::Ble),
            "mcap" | "mcap_stream" => Ok(Protocol::McapStream),
            "quic" | "http3" => Ok(Protocol::Quic),
            other => Err(ArvosError::config(format!("unknown protocol '{}'", other))),
        }
    }
}

/// A transport that feeds a dispatcher.
///
/// Implementations must not block in `start`: the accept loop runs on a
/// spawned task, and `start` returns once the transport is listening.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    /// Bind and begin accepting clients.
    async fn start(&mut self) -> Result<()>;

    /// Stop accepting clients and close existing connections.
    ///
    /// Callbacks already running are allowed to finish.
    async fn stop(&mut self) -> Result<()>;

    /// URL the app should connect to.
    fn connection_url(&self) -> String;

    fn protocol_name(&self) -> &'static str;
}

/// Best guess at this machine's LAN address, for printing connection URLs.
///
/// No packets are sent: connecting a UDP socket only selects a route.
pub fn local_ip() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Host to advertise for a listener bound to `host`.
pub(crate) fn advertised_host(host: &str) -> String {
    match host {
        "0.0.0.0" | "::" | "" => local_ip().to_string(),
        other => other.to_string(),
    }
}
