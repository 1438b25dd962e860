//! Phone telemetry records: IMU, GPS and 6DOF pose

use serde::{Deserialize, Serialize};
use std::fmt;

/// Converts a nanosecond timestamp to seconds.
pub(crate) fn ns_to_seconds(timestamp_ns: u64) -> f64 {
    timestamp_ns as f64 / 1_000_000_000.0
}

/// Inertial sample from the phone.
///
/// Angular velocity is in rad/s, linear acceleration in m/s².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImuData {
    pub timestamp_ns: u64,
    pub angular_velocity: [f64; 3],
    pub linear_acceleration: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnetic_field: Option<[f64; 3]>,
    /// Roll, pitch, yaw in radians when the device reports fused attitude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attitude: Option<[f64; 3]>,
}

impl ImuData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}

/// GNSS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsData {
    pub timestamp_ns: u64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub horizontal_accuracy: f64,
    #[serde(default)]
    pub vertical_accuracy: f64,
    /// Ground speed in m/s, negative when unavailable.
    #[serde(default)]
    pub speed: f64,
    /// Course over ground in degrees, negative when unavailable.
    #[serde(default)]
    pub course: f64,
}

impl GpsData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}

/// ARKit tracking quality attached to a pose.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackingState {
    Normal,
    Limited,
    NotAvailable,
    Other(String),
}

impl TrackingState {
    pub fn as_str(&self) -> &str {
        match self {
            TrackingState::Normal => "normal",
            TrackingState::Limited => "limited",
            TrackingState::NotAvailable => "not_available",
            TrackingState::Other(s) => s,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, TrackingState::Normal)
    }
}

impl From<String> for TrackingState {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "normal" => TrackingState::Normal,
            "limited" => TrackingState::Limited,
            "notavailable" => TrackingState::NotAvailable,
            _ => TrackingState::Other(s),
        }
    }
}

impl From<TrackingState> for String {
    fn from(state: TrackingState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 6DOF camera pose from ARKit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseData {
    pub timestamp_ns: u64,
    /// Translation in metres.
    pub position: [f64; 3],
    /// Unit quaternion as `[x, y, z, w]`.
    #[serde(alias = "rotation", alias = "quaternion")]
    pub orientation: [f64; 4],
    #[serde(default = "default_tracking_state")]
    pub tracking_state: TrackingState,
}

fn default_tracking_state() -> TrackingState {
    TrackingState::Normal
}

impl PoseData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}
