//! Error types for sensor stream decoding and dispatch.
//!
//! Every failure that can happen while turning transport bytes into a typed
//! sensor message, or while handing that message to user code, is expressed as
//! an [`ArvosError`]. None of them are fatal to a connection: the dispatch core
//! converts them into `on_error` notifications and keeps the session alive.
//!
//! ## Error Categories
//!
//! - **Envelope Errors**: the length-prefixed binary framing is inconsistent
//! - **Header Errors**: the JSON header parsed but is missing required fields
//! - **Camera Errors**: the image codec rejected the payload
//! - **Telemetry Errors**: a JSON telemetry message could not be interpreted
//! - **Callback Errors**: user code returned an error or panicked
//! - **Transport Errors**: an adapter failed to bind, accept or read
//! - **Config Errors**: configuration could not be loaded or is invalid
//!
//! ## Recovery
//!
//! ```rust
//! use arvos::{ArvosError, EnvelopeErrorReason};
//!
//! let error = ArvosError::malformed_envelope(
//!     EnvelopeErrorReason::HeaderLengthExceedsBuffer,
//!     "header claims 64 bytes, 12 available",
//! );
//! assert_eq!(error.code(), "header_length_exceeds_buffer");
//! assert!(error.is_recoverable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::SensorKind;

/// Result type alias for SDK operations.
pub type Result<T, E = ArvosError> = std::result::Result<T, E>;

/// Boxed error used as the source of transport and codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a binary envelope was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeErrorReason {
    /// Fewer than four bytes were available for the length prefix.
    TruncatedLengthPrefix,
    /// `4 + header_length` runs past the end of the buffer.
    HeaderLengthExceedsBuffer,
    /// The header bytes are not a UTF-8 JSON object.
    InvalidJson,
}

impl EnvelopeErrorReason {
    /// Stable snake_case code, suitable for logs and `on_error` consumers.
    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeErrorReason::TruncatedLengthPrefix => "truncated_length_prefix",
            EnvelopeErrorReason::HeaderLengthExceedsBuffer => "header_length_exceeds_buffer",
            EnvelopeErrorReason::InvalidJson => "invalid_json",
        }
    }
}

impl fmt::Display for EnvelopeErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the SDK.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ArvosError {
    #[error("Malformed envelope ({reason}): {details}")]
    MalformedEnvelope { reason: EnvelopeErrorReason, details: String },

    #[error("Invalid {kind} header: {details}")]
    InvalidHeader { kind: String, details: String },

    #[error("Failed to decode {format} camera frame: {details}")]
    CameraDecode {
        format: String,
        details: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid telemetry message: {details}")]
    Telemetry { details: String },

    #[error("Unknown message type '{type_name}'")]
    UnknownMessageType { type_name: String },

    #[error("Callback for {kind} failed")]
    Callback {
        kind: SensorKind,
        #[source]
        source: BoxError,
    },

    #[error("Callback for {kind} panicked: {message}")]
    CallbackPanicked { kind: SensorKind, message: String },

    #[error("Message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("{protocol} transport error: {reason}")]
    Transport {
        protocol: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArvosError {
    /// Stable snake_case code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ArvosError::MalformedEnvelope { reason, .. } => reason.as_str(),
            ArvosError::InvalidHeader { .. } => "invalid_header",
            ArvosError::CameraDecode { .. } => "camera_decode_error",
            ArvosError::Telemetry { .. } => "invalid_telemetry",
            ArvosError::UnknownMessageType { .. } => "unknown_message_type",
            ArvosError::Callback { .. } => "dispatch_callback_error",
            ArvosError::CallbackPanicked { .. } => "dispatch_callback_panic",
            ArvosError::MessageTooLarge { .. } => "message_too_large",
            ArvosError::Transport { .. } => "transport_error",
            ArvosError::Config { .. } => "config_error",
            ArvosError::File { .. } => "file_error",
        }
    }

    /// Returns whether the session can keep running after this error.
    ///
    /// Per-message failures only cost the message they occurred in.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ArvosError::MalformedEnvelope { .. } => true,
            ArvosError::InvalidHeader { .. } => true,
            ArvosError::CameraDecode { .. } => true,
            ArvosError::Telemetry { .. } => true,
            ArvosError::UnknownMessageType { .. } => true,
            ArvosError::Callback { .. } => true,
            ArvosError::CallbackPanicked { .. } => true,
            ArvosError::MessageTooLarge { .. } => true,
            ArvosError::Transport { .. } => false,
            ArvosError::Config { .. } => false,
            ArvosError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ArvosError::MalformedEnvelope { .. } => vec![
                "Check that the adapter forwards whole binary messages",
                "Verify the producer writes a little-endian u32 header length",
                "Reassemble chunked transports before parsing",
            ],
            ArvosError::InvalidHeader { .. } => vec![
                "Check the app version against the SDK version",
                "Inspect the JSON header for missing fields",
            ],
            ArvosError::CameraDecode { .. } => vec![
                "Verify the payload matches the declared format",
                "Check compressedSize against the payload length",
                "Disable pixel decoding to receive raw compressed frames",
            ],
            ArvosError::Telemetry { .. } => vec![
                "Check the message carries a 'type' field",
                "Verify numeric fields are not encoded as strings",
            ],
            ArvosError::UnknownMessageType { .. } => vec![
                "Update the SDK to a version that knows this sensor",
                "Ignore the message if the sensor is not needed",
            ],
            ArvosError::Callback { .. } | ArvosError::CallbackPanicked { .. } => vec![
                "Inspect the error source raised by the callback",
                "Keep callbacks short and offload heavy work",
            ],
            ArvosError::MessageTooLarge { .. } => vec![
                "Raise decoder.max_message_size in the configuration",
                "Check the stream is not desynchronised",
            ],
            ArvosError::Transport { .. } => vec![
                "Check the port is free and the host address is valid",
                "Verify firewall rules allow the connection",
                "Restart the adapter",
            ],
            ArvosError::Config { .. } => vec![
                "Check configuration values against the documented ranges",
            ],
            ArvosError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for envelope framing errors.
    pub fn malformed_envelope(reason: EnvelopeErrorReason, details: impl Into<String>) -> Self {
        ArvosError::MalformedEnvelope { reason, details: details.into() }
    }

    /// Helper constructor for header validation errors.
    pub fn invalid_header(kind: impl Into<String>, details: impl Into<String>) -> Self {
        ArvosError::InvalidHeader { kind: kind.into(), details: details.into() }
    }

    /// Helper constructor for camera codec errors.
    pub fn camera_decode(format: impl Into<String>, details: impl Into<String>) -> Self {
        ArvosError::CameraDecode { format: format.into(), details: details.into(), source: None }
    }

    /// Helper constructor for camera codec errors with source.
    pub fn camera_decode_with_source(
        format: impl Into<String>,
        details: impl Into<String>,
        source: BoxError,
    ) -> Self {
        ArvosError::CameraDecode {
            format: format.into(),
            details: details.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for telemetry parse errors.
    pub fn telemetry(details: impl Into<String>) -> Self {
        ArvosError::Telemetry { details: details.into() }
    }

    /// Helper constructor wrapping an error returned by a user callback.
    pub fn callback_failed(kind: SensorKind, source: anyhow::Error) -> Self {
        ArvosError::Callback { kind, source: source.into() }
    }

    /// Helper constructor for transport errors.
    pub fn transport(protocol: impl Into<String>, reason: impl Into<String>) -> Self {
        ArvosError::Transport { protocol: protocol.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        protocol: impl Into<String>,
        reason: impl Into<String>,
        source: BoxError,
    ) -> Self {
        ArvosError::Transport {
            protocol: protocol.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        ArvosError::Config { details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ArvosError::File { path, source }
    }
}
