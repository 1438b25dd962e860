//! Frame decoders
//!
//! [`MessageDecoder`] turns one transport frame into one [`SensorMessage`]:
//!
//! - text frames are telemetry JSON
//! - binary frames are envelopes, routed on the header `type` to the
//!   [`CameraDecoder`] or [`DepthDecoder`]
//! - binary frames that are not envelopes but hold a JSON object (BLE, MQTT)
//!   are parsed as telemetry
//!
//! Decoding is synchronous CPU work with no I/O, so it can run directly on an
//! adapter's receive loop.
//!
//! ## Usage Example
//!
//! ```rust
//! use arvos::decode::{InboundFrame, MessageDecoder};
//! use arvos::types::SensorKind;
//!
//! let decoder = MessageDecoder::default();
//! let frame = InboundFrame::Text(
//!     r#"{"type":"gps","timestampNs":1,"latitude":48.85,"longitude":2.35}"#.to_string(),
//! );
//!
//! let decoded = decoder.decode(&frame)?;
//! assert_eq!(decoded.message.kind(), SensorKind::Gps);
//! # Ok::<(), arvos::ArvosError>(())
//! ```

mod camera;
mod depth;

pub use camera::{CameraDecoder, CameraHeader};
pub use depth::{
    CONFIDENCE_OFFSET, CONFIDENCE_RECORD_SIZE, DecodedDepth, DepthDecodeReport, DepthDecoder,
    DepthHeader, RecordLayout, truncate_to_record_boundary,
};

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::trace;

use crate::config::DecoderConfig;
use crate::types::{DepthFormat, SensorKind, SensorMessage};
use crate::wire::{self, Envelope, parse_envelope};
use crate::{ArvosError, Result};

/// One message as delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Text(String),
    Binary(Bytes),
}

impl InboundFrame {
    /// Size on the wire, used for `bytes_received` accounting.
    pub fn len(&self) -> usize {
        match self {
            InboundFrame::Text(text) => text.len(),
            InboundFrame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for InboundFrame {
    fn from(text: String) -> Self {
        InboundFrame::Text(text)
    }
}

impl From<Bytes> for InboundFrame {
    fn from(bytes: Bytes) -> Self {
        InboundFrame::Binary(bytes)
    }
}

impl From<Vec<u8>> for InboundFrame {
    fn from(bytes: Vec<u8>) -> Self {
        InboundFrame::Binary(Bytes::from(bytes))
    }
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub message: SensorMessage,
    /// Present for point-cloud depth frames.
    pub depth_report: Option<DepthDecodeReport>,
}

impl From<SensorMessage> for Decoded {
    fn from(message: SensorMessage) -> Self {
        Self { message, depth_report: None }
    }
}

/// Decodes transport frames into typed messages.
#[derive(Debug, Clone, Copy)]
pub struct MessageDecoder {
    camera: CameraDecoder,
    depth: DepthDecoder,
    max_message_size: usize,
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new(&DecoderConfig::default())
    }
}

impl MessageDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            camera: CameraDecoder::new(config.decode_camera_pixels),
            depth: DepthDecoder::new(config.confidence_threshold),
            max_message_size: config.max_message_size,
        }
    }

    pub fn decode(&self, frame: &InboundFrame) -> Result<Decoded> {
        self.check_size(frame.len())?;
        match frame {
            InboundFrame::Text(text) => wire::parse_telemetry(text).map(Decoded::from),
            InboundFrame::Binary(bytes) => self.decode_binary(bytes),
        }
    }

    /// Decode a binary frame.
    pub fn decode_binary(&self, bytes: &Bytes) -> Result<Decoded> {
        self.check_size(bytes.len())?;

        match parse_envelope(bytes) {
            Ok(envelope) => self.decode_envelope(envelope),
            Err(envelope_error) if bytes.first() == Some(&b'{') => {
                trace!("Binary frame is not an envelope, trying telemetry JSON");
                wire::parse_telemetry_slice(bytes)
                    .map(Decoded::from)
                    .map_err(|_| envelope_error)
            }
            Err(e) => Err(e),
        }
    }

    /// Decode an already-split envelope.
    pub fn decode_envelope(&self, envelope: Envelope) -> Result<Decoded> {
        let Envelope { mut header, payload } = envelope;
        let kind = envelope_kind(&mut header)?;

        match kind {
            SensorKind::Camera => {
                let header = CameraHeader::from_map(header)?;
                let frame = self.camera.decode(header, payload)?;
                Ok(SensorMessage::Camera(frame).into())
            }
            SensorKind::Depth => {
                let header = DepthHeader::from_map(header)?;
                let DecodedDepth { frame, report } = self.depth.decode(header, payload)?;
                let depth_report = (frame.format == DepthFormat::PointCloud).then_some(report);
                Ok(Decoded { message: SensorMessage::Depth(frame), depth_report })
            }
            other => {
                // Telemetry wrapped in an envelope carries everything in the header.
                header.insert("type".to_string(), Value::String(other.as_str().to_string()));
                wire::parse_telemetry_value(Value::Object(header)).map(Decoded::from)
            }
        }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(ArvosError::MessageTooLarge { size, limit: self.max_message_size });
        }
        Ok(())
    }
}

fn envelope_kind(header: &mut Map<String, Value>) -> Result<SensorKind> {
    wire::telemetry::take_kind(header).map_err(|e| match e {
        ArvosError::Telemetry { details } => ArvosError::invalid_header("envelope", details),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnvelopeErrorReason;
    use crate::test_utils::{camera_envelope, depth_envelope, depth_payload, sample_points};
    use crate::wire::frame_message;
    use serde_json::json;

    #[test]
    fn text_frames_are_telemetry() {
        let decoded = MessageDecoder::default()
            .decode(&InboundFrame::Text(
                r#"{"type":"imu","timestampNs":1,"angularVelocity":[0,0,0],"linearAcceleration":[0,0,0]}"#
                    .to_string(),
            ))
            .unwrap();
        assert_eq!(decoded.message.kind(), SensorKind::Imu);
        assert!(decoded.depth_report.is_none());
    }

    #[test]
    fn camera_envelopes_are_decoded() {
        let decoded = MessageDecoder::default().decode_binary(&camera_envelope(4, 4)).unwrap();
        let SensorMessage::Camera(frame) = decoded.message else {
            panic!("expected camera frame");
        };
        assert!(frame.image().is_some());
    }

    #[test]
    fn depth_envelopes_carry_a_report() {
        let envelope = depth_envelope(7, &depth_payload(&sample_points(5)));
        let decoded = MessageDecoder::default().decode_binary(&envelope).unwrap();

        assert_eq!(decoded.message.kind(), SensorKind::Depth);
        let report = decoded.depth_report.unwrap();
        assert_eq!(report.usable_records, 5);
        assert!(report.count_mismatch());
    }

    #[test]
    fn json_in_binary_frame_is_telemetry() {
        let bytes = Bytes::from_static(br#"{"type":"status","timestampNs":1,"battery":0.5}"#);
        let decoded = MessageDecoder::default().decode_binary(&bytes).unwrap();
        assert_eq!(decoded.message.kind(), SensorKind::Status);
    }

    #[test]
    fn garbage_reports_the_envelope_error() {
        let err = MessageDecoder::default().decode_binary(&Bytes::from_static(b"{oops")).unwrap_err();
        assert!(matches!(
            err,
            ArvosError::MalformedEnvelope { reason: EnvelopeErrorReason::HeaderLengthExceedsBuffer, .. }
        ));
    }

    #[test]
    fn envelope_without_type_is_invalid_header() {
        let header = json!({"timestampNs": 1}).as_object().cloned().unwrap();
        let bytes = wire::encode_envelope(&header, &[]).unwrap();
        let err = MessageDecoder::default().decode_binary(&bytes).unwrap_err();
        assert_eq!(err.code(), "invalid_header");
    }

    #[test]
    fn telemetry_inside_an_envelope_is_accepted() {
        let header = json!({"type": "handshake", "deviceName": "iPhone"}).as_object().cloned().unwrap();
        let bytes = wire::encode_envelope(&header, &[]).unwrap();
        let decoded = MessageDecoder::default().decode_binary(&bytes).unwrap();
        assert_eq!(decoded.message.kind(), SensorKind::Handshake);
    }

    #[test]
    fn oversized_frames_are_rejected_before_parsing() {
        let config = DecoderConfig { max_message_size: 8, ..Default::default() };
        let frame = InboundFrame::from(frame_message(&[0; 16]).unwrap());
        let err = MessageDecoder::new(&config).decode(&frame).unwrap_err();
        assert!(matches!(err, ArvosError::MessageTooLarge { size: 20, limit: 8 }));
    }
}
