//! Receive and decode sensor streams from the ARVOS iPhone app.
//!
//! The app streams camera frames, LiDAR depth, IMU, GPS, ARKit pose and Apple
//! Watch motion over one of several transports. This crate turns those
//! transport frames into typed Rust values and routes them to your callbacks.
//!
//! # Features
//!
//! - **Wire formats**: length-prefixed binary envelopes and JSON telemetry
//! - **Defensive decoding**: misaligned depth buffers are truncated, not rejected
//! - **Dispatch core**: one callback per sensor kind, per-connection ordering,
//!   error isolation per message
//! - **Transports**: a WebSocket adapter, plus an [`Adapter`] trait for others
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use arvos::{Arvos, SdkConfig};
//! use arvos::types::{CameraFrame, DepthFrame, ImuData};
//!
//! #[tokio::main]
//! async fn main() -> arvos::Result<()> {
//!     arvos::logging::init("arvos=info");
//!
//!     let dispatcher = Arvos::dispatcher()
//!         .on::<ImuData, _>(|_, imu| {
//!             println!("accel: {:?}", imu.linear_acceleration);
//!             Ok(())
//!         })
//!         .on::<CameraFrame, _>(|_, frame| {
//!             println!("camera {}x{} ({:.1} KB)", frame.width, frame.height, frame.size_kb());
//!             Ok(())
//!         })
//!         .on::<DepthFrame, _>(|_, depth| {
//!             println!("depth: {} points", depth.point_count);
//!             Ok(())
//!         })
//!         .build();
//!
//!     let adapter = Arvos::serve(&SdkConfig::default(), dispatcher).await?;
//!     println!("Connect the app to {}", arvos::Adapter::connection_url(&adapter));
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Decoding pipeline
pub mod decode;
pub mod wire;

// Routing and transports
pub mod adapter;
pub mod dispatch;

// Ambient
pub mod config;
pub mod logging;

#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Core exports
pub use error::*;
pub use types::{ConnectionId, SensorKind, SensorMessage, SensorSample};

// Main API exports
pub use adapter::{Adapter, Protocol};
pub use config::SdkConfig;
pub use decode::{InboundFrame, MessageDecoder};
pub use dispatch::{Callback, DispatchOutcome, Dispatcher, DispatcherBuilder};

#[cfg(feature = "websocket")]
pub use adapter::WebSocketAdapter;

/// Unified entry point for ARVOS sessions.
///
/// Builds dispatchers and starts the built-in transport.
pub struct Arvos;

impl Arvos {
    /// Start building a [`Dispatcher`].
    pub fn dispatcher() -> DispatcherBuilder {
        Dispatcher::builder()
    }

    /// Start the built-in adapter selected by `config.server`.
    ///
    /// Only WebSocket is built in; other transports implement [`Adapter`]
    /// around the same [`Dispatcher`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The configured protocol has no built-in adapter
    /// - The listener cannot bind
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use arvos::{Arvos, SdkConfig};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> arvos::Result<()> {
    /// let config = SdkConfig::from_file("arvos.yaml")?;
    /// let dispatcher = Arvos::dispatcher().config(&config).build();
    /// let adapter = Arvos::serve(&config, dispatcher).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "websocket")]
    pub async fn serve(config: &SdkConfig, dispatcher: Dispatcher) -> Result<WebSocketAdapter> {
        config.validate()?;

        if config.server.protocol != Protocol::WebSocket {
            return Err(ArvosError::config(format!(
                "no built-in adapter for {}; implement arvos::Adapter for it",
                config.server.protocol
            )));
        }

        let mut adapter = WebSocketAdapter::new(config.server.clone(), dispatcher);
        adapter.start().await?;
        Ok(adapter)
    }
}
