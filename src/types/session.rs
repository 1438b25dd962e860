//! Session-level messages: handshake, status and device-side errors

use serde::{Deserialize, Serialize};

use super::telemetry::ns_to_seconds;

/// Sensors the device reports at session start.
///
/// Advisory only: nothing in the SDK refuses messages for sensors the
/// device did not announce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceCapabilities {
    #[serde(alias = "hasLiDAR", alias = "hasLiDar")]
    pub has_lidar: bool,
    #[serde(alias = "hasARKit", alias = "hasArKit")]
    pub has_arkit: bool,
    #[serde(alias = "hasGPS")]
    pub has_gps: bool,
    #[serde(alias = "hasIMU")]
    pub has_imu: bool,
    pub has_watch: bool,
    pub supported_modes: Vec<String>,
}

/// First message of a session, identifying the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandshakeMessage {
    pub device_name: String,
    pub device_model: String,
    pub os_version: String,
    pub app_version: String,
    pub capabilities: DeviceCapabilities,
}

/// Free-form status update from the app (recording state, battery, mode).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    #[serde(default)]
    pub timestamp_ns: u64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StatusMessage {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }

    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }
}

/// Error reported by the app itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceErrorMessage {
    #[serde(alias = "error")]
    pub message: String,
    pub details: Option<String>,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handshake_reads_apple_capitalisation() {
        let handshake: HandshakeMessage = serde_json::from_value(json!({
            "deviceName": "Lab iPhone",
            "deviceModel": "iPhone 15 Pro",
            "osVersion": "17.1",
            "appVersion": "1.0.0",
            "capabilities": {
                "hasLiDAR": true,
                "hasARKit": true,
                "hasGPS": false,
                "hasIMU": true,
                "supportedModes": ["rgbd", "imu_only"],
            }
        }))
        .unwrap();

        assert!(handshake.capabilities.has_lidar);
        assert!(handshake.capabilities.has_arkit);
        assert!(!handshake.capabilities.has_gps);
        assert_eq!(handshake.capabilities.supported_modes.len(), 2);
    }

    #[test]
    fn status_keeps_unknown_fields() {
        let status: StatusMessage = serde_json::from_value(json!({
            "timestampNs": 5,
            "recording": true,
            "battery": 0.8,
        }))
        .unwrap();

        assert_eq!(status.timestamp_ns, 5);
        assert_eq!(status.get("recording"), Some(&json!(true)));
        assert!(status.get("timestampNs").is_none());
    }

    #[test]
    fn device_error_accepts_error_field() {
        let error: DeviceErrorMessage = serde_json::from_value(json!({
            "error": "camera unavailable",
            "details": "in use by another app",
        }))
        .unwrap();

        assert_eq!(error.message, "camera unavailable");
        assert!(error.code.is_none());
    }
}
