//! Typed message model for every sensor the app streams.
//!
//! This module provides the transport-independent representation of sensor
//! samples. Protocol adapters and decoders produce these types; the dispatch
//! core routes them; user callbacks consume them.
//!
//! ## Architecture
//!
//! - [`SensorMessage`] is the single enum that flows through dispatch
//! - [`SensorKind`] is its discriminator and the key of the callback registry
//! - [`SensorSample`] links each record type to its kind for typed callbacks
//! - [`CameraFrame`] and [`DepthFrame`] share payload memory via [`bytes::Bytes`]
//! - Telemetry records are plain immutable values parsed from camelCase JSON
//!
//! ## Usage Example
//!
//! ```rust
//! use arvos::types::{ImuData, SensorKind, SensorMessage, SensorSample};
//!
//! let imu = ImuData {
//!     timestamp_ns: 1_000_000_000,
//!     angular_velocity: [0.0, 0.0, 0.1],
//!     linear_acceleration: [0.0, 0.0, -9.81],
//!     magnetic_field: None,
//!     attitude: None,
//! };
//!
//! let message = SensorMessage::from(imu);
//! assert_eq!(message.kind(), SensorKind::Imu);
//!
//! let back = ImuData::from_message(message).unwrap();
//! assert_eq!(back.timestamp_s(), 1.0);
//! ```

mod camera;
mod connection;
mod depth;
mod kind;
mod message;
mod session;
mod telemetry;
mod watch;

// Re-export all public types
pub use camera::{CameraFormat, CameraFrame, CameraIntrinsics};
pub use connection::ConnectionId;
pub use depth::{DepthFormat, DepthFrame, POINT_RECORD_SIZE, Point, PointCloud};
pub use kind::SensorKind;
pub use message::{SensorMessage, SensorSample};
pub use session::{DeviceCapabilities, DeviceErrorMessage, HandshakeMessage, StatusMessage};
pub use telemetry::{GpsData, ImuData, PoseData, TrackingState};
pub use watch::{MotionActivity, WatchAttitudeData, WatchImuData, WatchMotionActivityData};
