//! The typed sensor message and its per-kind sample trait

use super::{
    CameraFrame, DepthFrame, DeviceErrorMessage, GpsData, HandshakeMessage, ImuData, PoseData,
    SensorKind, StatusMessage, WatchAttitudeData, WatchImuData, WatchMotionActivityData,
};

/// A fully decoded message from the device, independent of transport.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorMessage {
    Handshake(HandshakeMessage),
    Imu(ImuData),
    Gps(GpsData),
    Pose(PoseData),
    Camera(CameraFrame),
    Depth(DepthFrame),
    WatchImu(WatchImuData),
    WatchAttitude(WatchAttitudeData),
    WatchActivity(WatchMotionActivityData),
    Status(StatusMessage),
    Error(DeviceErrorMessage),
}

impl SensorMessage {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorMessage::Handshake(_) => SensorKind::Handshake,
            SensorMessage::Imu(_) => SensorKind::Imu,
            SensorMessage::Gps(_) => SensorKind::Gps,
            SensorMessage::Pose(_) => SensorKind::Pose,
            SensorMessage::Camera(_) => SensorKind::Camera,
            SensorMessage::Depth(_) => SensorKind::Depth,
            SensorMessage::WatchImu(_) => SensorKind::WatchImu,
            SensorMessage::WatchAttitude(_) => SensorKind::WatchAttitude,
            SensorMessage::WatchActivity(_) => SensorKind::WatchActivity,
            SensorMessage::Status(_) => SensorKind::Status,
            SensorMessage::Error(_) => SensorKind::Error,
        }
    }

    /// Device timestamp, for kinds that carry one.
    pub fn timestamp_ns(&self) -> Option<u64> {
        match self {
            SensorMessage::Imu(m) => Some(m.timestamp_ns),
            SensorMessage::Gps(m) => Some(m.timestamp_ns),
            SensorMessage::Pose(m) => Some(m.timestamp_ns),
            SensorMessage::Camera(m) => Some(m.timestamp_ns),
            SensorMessage::Depth(m) => Some(m.timestamp_ns),
            SensorMessage::WatchImu(m) => Some(m.timestamp_ns),
            SensorMessage::WatchAttitude(m) => Some(m.timestamp_ns),
            SensorMessage::WatchActivity(m) => Some(m.timestamp_ns),
            SensorMessage::Status(m) => Some(m.timestamp_ns),
            SensorMessage::Handshake(_) | SensorMessage::Error(_) => None,
        }
    }
}

/// A record type that is carried by exactly one [`SensorMessage`] variant.
///
/// Used to register callbacks that take the concrete record instead of the
/// whole message enum.
pub trait SensorSample: Sized + Send + 'static {
    /// The kind whose callback slot this record occupies.
    const KIND: SensorKind;

    /// Extract the record, or `None` if the message is of another kind.
    fn from_message(message: SensorMessage) -> Option<Self>;

    fn into_message(self) -> SensorMessage;
}

macro_rules! sensor_sample {
    ($ty:ty, $variant:ident) => {
        impl SensorSample for $ty {
            const KIND: SensorKind = SensorKind::$variant;

            fn from_message(message: SensorMessage) -> Option<Self> {
                match message {
                    SensorMessage::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_message(self) -> SensorMessage {
                SensorMessage::$variant(self)
            }
        }

        impl From<$ty> for SensorMessage {
            fn from(value: $ty) -> Self {
                SensorMessage::$variant(value)
            }
        }
    };
}

sensor_sample!(HandshakeMessage, Handshake);
sensor_sample!(ImuData, Imu);
sensor_sample!(GpsData, Gps);
sensor_sample!(PoseData, Pose);
sensor_sample!(CameraFrame, Camera);
sensor_sample!(DepthFrame, Depth);
sensor_sample!(WatchImuData, WatchImu);
sensor_sample!(WatchAttitudeData, WatchAttitude);
sensor_sample!(WatchMotionActivityData, WatchActivity);
sensor_sample!(StatusMessage, Status);
sensor_sample!(DeviceErrorMessage, Error);

#[cfg(test)]
mod tests {
    use super::*;

    fn imu(ts: u64) -> ImuData {
        ImuData {
            timestamp_ns: ts,
            angular_velocity: [0.0; 3],
            linear_acceleration: [0.0, 0.0, -9.81],
            magnetic_field: None,
            attitude: None,
        }
    }

    #[test]
    fn sample_round_trips_through_message() {
        let message = imu(42).into_message();
        assert_eq!(message.kind(), ImuData::KIND);
        assert_eq!(message.timestamp_ns(), Some(42));
        assert_eq!(ImuData::from_message(message), Some(imu(42)));
    }

    #[test]
    fn from_message_rejects_other_kinds() {
        let message = SensorMessage::from(HandshakeMessage::default());
        assert!(ImuData::from_message(message).is_none());
    }
}
