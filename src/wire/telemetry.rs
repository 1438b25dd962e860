//! JSON telemetry messages
//!
//! Low-rate sensors (IMU, GPS, pose, watch, session messages) are sent as one
//! flat JSON object per message, discriminated by a `type` field. Some app
//! builds use `sensorType` instead; both are accepted.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

use crate::types::{SensorKind, SensorMessage};
use crate::{ArvosError, Result};

/// Field names that carry the message kind.
pub const TYPE_FIELDS: [&str; 2] = ["type", "sensorType"];

/// Parse one telemetry text message.
pub fn parse_telemetry(text: &str) -> Result<SensorMessage> {
    let value = serde_json::from_str::<Value>(text)
        .map_err(|e| ArvosError::telemetry(format!("not valid JSON: {}", e)))?;
    parse_telemetry_value(value)
}

/// Parse one telemetry message delivered as raw bytes (MQTT, BLE).
pub fn parse_telemetry_slice(bytes: &[u8]) -> Result<SensorMessage> {
    let value = serde_json::from_slice::<Value>(bytes)
        .map_err(|e| ArvosError::telemetry(format!("not valid JSON: {}", e)))?;
    parse_telemetry_value(value)
}

/// Parse an already-decoded JSON value.
pub fn parse_telemetry_value(value: Value) -> Result<SensorMessage> {
    let Value::Object(mut fields) = value else {
        return Err(ArvosError::telemetry("message must be a JSON object"));
    };

    let kind = take_kind(&mut fields)?;
    trace!("Parsing {} telemetry message", kind);

    let message = match kind {
        SensorKind::Handshake => SensorMessage::Handshake(from_fields(kind, fields)?),
        SensorKind::Imu => SensorMessage::Imu(from_fields(kind, fields)?),
        SensorKind::Gps => SensorMessage::Gps(from_fields(kind, fields)?),
        SensorKind::Pose => SensorMessage::Pose(from_fields(kind, fields)?),
        SensorKind::WatchImu => SensorMessage::WatchImu(from_fields(kind, fields)?),
        SensorKind::WatchAttitude => SensorMessage::WatchAttitude(from_fields(kind, fields)?),
        SensorKind::WatchActivity => SensorMessage::WatchActivity(from_fields(kind, fields)?),
        SensorKind::Status => SensorMessage::Status(from_fields(kind, fields)?),
        SensorKind::Error => SensorMessage::Error(from_fields(kind, fields)?),
        SensorKind::Camera | SensorKind::Depth => {
            return Err(ArvosError::telemetry(format!(
                "{} messages must arrive as binary envelopes",
                kind
            )));
        }
    };

    Ok(message)
}

/// Remove the discriminator fields and resolve the kind they name.
pub(crate) fn take_kind(fields: &mut Map<String, Value>) -> Result<SensorKind> {
    let mut type_name = None;
    for field in TYPE_FIELDS {
        if let Some(value) = fields.remove(field) {
            if type_name.is_none() {
                type_name = Some(value);
            }
        }
    }

    match type_name {
        Some(Value::String(name)) => name.parse(),
        Some(other) => Err(ArvosError::telemetry(format!("'type' must be a string, got {}", other))),
        None => Err(ArvosError::telemetry("missing 'type' field")),
    }
}

fn from_fields<T: DeserializeOwned>(kind: SensorKind, fields: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ArvosError::telemetry(format!("invalid {} message: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MotionActivity, TrackingState};

    #[test]
    fn imu_message_parses() {
        let message = parse_telemetry(
            r#"{"type":"imu","timestampNs":1500000000,"angularVelocity":[0.1,0.2,0.3],"linearAcceleration":[0.0,0.0,-9.81]}"#,
        )
        .unwrap();

        let SensorMessage::Imu(imu) = message else {
            panic!("expected imu, got {:?}", message);
        };
        assert_eq!(imu.timestamp_ns, 1_500_000_000);
        assert_eq!(imu.angular_velocity, [0.1, 0.2, 0.3]);
        assert_eq!(imu.timestamp_s(), 1.5);
    }

    #[test]
    fn sensor_type_field_is_accepted() {
        let message = parse_telemetry(
            r#"{"sensorType":"gps","timestampNs":1,"latitude":37.7,"longitude":-122.4}"#,
        )
        .unwrap();
        assert_eq!(message.kind(), SensorKind::Gps);
    }

    #[test]
    fn pose_defaults_tracking_state() {
        let message = parse_telemetry(
            r#"{"type":"pose","timestampNs":1,"position":[1,2,3],"orientation":[0,0,0,1]}"#,
        )
        .unwrap();
        let SensorMessage::Pose(pose) = message else {
            panic!("expected pose");
        };
        assert_eq!(pose.tracking_state, TrackingState::Normal);
    }

    #[test]
    fn watch_activity_accepts_camel_case_type() {
        let message = parse_telemetry(
            r#"{"type":"watchActivity","timestampNs":9,"state":"walking","confidence":2}"#,
        )
        .unwrap();
        let SensorMessage::WatchActivity(activity) = message else {
            panic!("expected watch activity");
        };
        assert_eq!(activity.state, MotionActivity::Walking);
    }

    #[test]
    fn status_does_not_keep_discriminator() {
        let message =
            parse_telemetry(r#"{"type":"status","timestampNs":3,"recording":true}"#).unwrap();
        let SensorMessage::Status(status) = message else {
            panic!("expected status");
        };
        assert!(status.get("type").is_none());
        assert_eq!(status.get("recording"), Some(&Value::Bool(true)));
    }

    #[test]
    fn bytes_are_parsed_like_text() {
        let message = parse_telemetry_slice(br#"{"type":"error","message":"thermal"}"#).unwrap();
        assert_eq!(message.kind(), SensorKind::Error);
    }

    #[test]
    fn failures_are_typed() {
        assert_eq!(parse_telemetry("{not json").unwrap_err().code(), "invalid_telemetry");
        assert_eq!(parse_telemetry("[1,2]").unwrap_err().code(), "invalid_telemetry");
        assert_eq!(parse_telemetry(r#"{"timestampNs":1}"#).unwrap_err().code(), "invalid_telemetry");
        assert_eq!(parse_telemetry(r#"{"type":7}"#).unwrap_err().code(), "invalid_telemetry");
        assert_eq!(
            parse_telemetry(r#"{"type":"barometer"}"#).unwrap_err().code(),
            "unknown_message_type"
        );
        assert_eq!(
            parse_telemetry(r#"{"type":"imu","timestampNs":1}"#).unwrap_err().code(),
            "invalid_telemetry"
        );
    }

    #[test]
    fn binary_kinds_are_rejected_as_text() {
        let err = parse_telemetry(r#"{"type":"camera","timestampNs":1}"#).unwrap_err();
        assert!(err.to_string().contains("binary envelopes"));
    }
}
