//! Apple Watch telemetry records

use serde::{Deserialize, Serialize};
use std::fmt;

use super::telemetry::ns_to_seconds;

/// Inertial sample relayed from the paired watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchImuData {
    pub timestamp_ns: u64,
    pub angular_velocity: [f64; 3],
    #[serde(alias = "userAcceleration")]
    pub linear_acceleration: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gravity: Option<[f64; 3]>,
}

impl WatchImuData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}

/// Fused watch attitude. Angles in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchAttitudeData {
    pub timestamp_ns: u64,
    /// `[x, y, z, w]`
    pub quaternion: [f64; 4],
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_frame: Option<String>,
}

impl WatchAttitudeData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}

/// Motion activity classification reported by CoreMotion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MotionActivity {
    Stationary,
    Walking,
    Running,
    Cycling,
    Automotive,
    Unknown,
    Other(String),
}

impl MotionActivity {
    pub fn as_str(&self) -> &str {
        match self {
            MotionActivity::Stationary => "stationary",
            MotionActivity::Walking => "walking",
            MotionActivity::Running => "running",
            MotionActivity::Cycling => "cycling",
            MotionActivity::Automotive => "automotive",
            MotionActivity::Unknown => "unknown",
            MotionActivity::Other(s) => s,
        }
    }
}

impl From<String> for MotionActivity {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stationary" => MotionActivity::Stationary,
            "walking" => MotionActivity::Walking,
            "running" => MotionActivity::Running,
            "cycling" => MotionActivity::Cycling,
            "automotive" | "vehicle" => MotionActivity::Automotive,
            "unknown" => MotionActivity::Unknown,
            _ => MotionActivity::Other(s),
        }
    }
}

impl From<MotionActivity> for String {
    fn from(activity: MotionActivity) -> Self {
        activity.as_str().to_string()
    }
}

impl fmt::Display for MotionActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchMotionActivityData {
    pub timestamp_ns: u64,
    pub state: MotionActivity,
    /// Classifier confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

impl WatchMotionActivityData {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }
}
