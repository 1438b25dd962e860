//! Sensor kind discriminator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ArvosError;

/// The kind of sensor message, used to route a message to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Handshake,
    Imu,
    Gps,
    Pose,
    Camera,
    Depth,
    WatchImu,
    WatchAttitude,
    WatchActivity,
    Status,
    Error,
}

impl SensorKind {
    /// Every kind, in wire-protocol order.
    pub const ALL: [SensorKind; 11] = [
        SensorKind::Handshake,
        SensorKind::Imu,
        SensorKind::Gps,
        SensorKind::Pose,
        SensorKind::Camera,
        SensorKind::Depth,
        SensorKind::WatchImu,
        SensorKind::WatchAttitude,
        SensorKind::WatchActivity,
        SensorKind::Status,
        SensorKind::Error,
    ];

    /// Snake_case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Handshake => "handshake",
            SensorKind::Imu => "imu",
            SensorKind::Gps => "gps",
            SensorKind::Pose => "pose",
            SensorKind::Camera => "camera",
            SensorKind::Depth => "depth",
            SensorKind::WatchImu => "watch_imu",
            SensorKind::WatchAttitude => "watch_attitude",
            SensorKind::WatchActivity => "watch_activity",
            SensorKind::Status => "status",
            SensorKind::Error => "error",
        }
    }

    /// Whether this kind travels inside a binary envelope rather than as JSON.
    pub fn is_binary(self) -> bool {
        matches!(self, SensorKind::Camera | SensorKind::Depth)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = ArvosError;

    /// Accepts snake_case, camelCase and lowercase spellings
    /// (`watch_imu`, `watchImu`, `watchimu`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.chars().filter(|c| *c != '_' && *c != '-').flat_map(char::to_lowercase).collect();

        let kind = match normalized.as_str() {
            "handshake" => SensorKind::Handshake,
            "imu" => SensorKind::Imu,
            "gps" | "location" => SensorKind::Gps,
            "pose" => SensorKind::Pose,
            "camera" => SensorKind::Camera,
            "depth" | "lidar" => SensorKind::Depth,
            "watchimu" => SensorKind::WatchImu,
            "watchattitude" => SensorKind::WatchAttitude,
            "watchactivity" | "watchmotionactivity" => SensorKind::WatchActivity,
            "status" => SensorKind::Status,
            "error" => SensorKind::Error,
            _ => return Err(ArvosError::UnknownMessageType { type_name: s.to_string() }),
        };

        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in SensorKind::ALL {
            assert_eq!(kind.as_str().parse::<SensorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        assert_eq!("watchImu".parse::<SensorKind>().unwrap(), SensorKind::WatchImu);
        assert_eq!("WATCH_ATTITUDE".parse::<SensorKind>().unwrap(), SensorKind::WatchAttitude);
        assert_eq!("watchMotionActivity".parse::<SensorKind>().unwrap(), SensorKind::WatchActivity);
        assert_eq!("IMU".parse::<SensorKind>().unwrap(), SensorKind::Imu);
    }

    #[test]
    fn unknown_kinds_are_reported() {
        let err = "barometer".parse::<SensorKind>().unwrap_err();
        assert!(matches!(err, ArvosError::UnknownMessageType { ref type_name } if type_name == "barometer"));
    }

    #[test]
    fn only_frames_are_binary() {
        let binary: Vec<_> = SensorKind::ALL.into_iter().filter(|k| k.is_binary()).collect();
        assert_eq!(binary, vec![SensorKind::Camera, SensorKind::Depth]);
    }
}
