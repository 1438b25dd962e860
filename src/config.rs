//! SDK configuration
//!
//! Configuration is plain data with defaults for every field, so an empty
//! YAML document is a valid configuration:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 9090
//!   protocol: websocket
//! decoder:
//!   confidence_threshold: 0.5
//!   decode_camera_pixels: false
//!   max_message_size: 16777216
//! dispatch:
//!   closed_connection_memory: 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::adapter::Protocol;
use crate::{ArvosError, Result};

/// Default upper bound for a single wire message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub server: ServerConfig,
    pub decoder: DecoderConfig,
    pub dispatch: DispatchConfig,
}

impl SdkConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SdkConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ArvosError::config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ArvosError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| ArvosError::config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.decoder.validate()?;
        self.dispatch.validate()
    }
}

/// Where an adapter listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// `None` selects the protocol's default port.
    pub port: Option<u16>,
    pub protocol: Protocol,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: None, protocol: Protocol::WebSocket }
    }
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// `host:port` suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ArvosError::config("server.host must not be empty"));
        }
        Ok(())
    }
}

/// Frame decoder behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Depth points with a confidence below this are dropped. `0.0` keeps all.
    pub confidence_threshold: f32,
    /// Decode JPEG payloads to RGB pixels.
    pub decode_camera_pixels: bool,
    /// Largest binary message accepted from a transport.
    pub max_message_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.0,
            decode_camera_pixels: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl DecoderConfig {
    fn validate(&self) -> Result<()> {
        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err(ArvosError::config(format!(
                "decoder.confidence_threshold must be a non-negative number, got {}",
                self.confidence_threshold
            )));
        }
        if self.max_message_size == 0 {
            return Err(ArvosError::config("decoder.max_message_size must be greater than zero"));
        }
        Ok(())
    }
}

/// Dispatch core behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How many disconnected connection ids are remembered so that late
    /// messages for them are dropped instead of re-creating the connection.
    pub closed_connection_memory: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { closed_connection_memory: 1024 }
    }
}

impl DispatchConfig {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SdkConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, SdkConfig::default());
        assert_eq!(config.server.port(), 9090);
        assert_eq!(config.decoder.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = SdkConfig::from_yaml_str(
            "server:\n  protocol: mqtt\ndecoder:\n  confidence_threshold: 0.5\n",
        )
        .unwrap();

        assert_eq!(config.server.protocol, Protocol::Mqtt);
        assert_eq!(config.server.port(), 1883);
        assert_eq!(config.server.bind_address(), "0.0.0.0:1883");
        assert_eq!(config.decoder.confidence_threshold, 0.5);
        assert!(config.decoder.decode_camera_pixels);
    }

    #[test]
    fn explicit_port_wins() {
        let config = SdkConfig::from_yaml_str("server:\n  port: 9999\n").unwrap();
        assert_eq!(config.server.port(), 9999);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = SdkConfig::from_yaml_str("decoder:\n  confidence_threshold: -1.0\n").unwrap_err();
        assert_eq!(err.code(), "config_error");

        let err = SdkConfig::from_yaml_str("decoder:\n  max_message_size: 0\n").unwrap_err();
        assert_eq!(err.code(), "config_error");

        let err = SdkConfig::from_yaml_str("server:\n  host: ''\n").unwrap_err();
        assert_eq!(err.code(), "config_error");

        let err = SdkConfig::from_yaml_str("server: [1, 2").unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = SdkConfig::default();
        config.server.protocol = Protocol::Quic;
        config.decoder.decode_camera_pixels = false;

        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(SdkConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SdkConfig::from_file("/nonexistent/arvos.yaml").unwrap_err();
        assert!(matches!(err, ArvosError::File { .. }));
        assert!(err.to_string().contains("arvos.yaml"));
    }
}
