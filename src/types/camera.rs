//! Camera frame types

use bytes::Bytes;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::telemetry::ns_to_seconds;
use crate::ArvosError;

/// Compression used for a camera payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFormat {
    Jpeg,
    H264,
}

impl CameraFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CameraFormat::Jpeg => "jpeg",
            CameraFormat::H264 => "h264",
        }
    }
}

impl fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraFormat {
    type Err = ArvosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(CameraFormat::Jpeg),
            "h264" | "h.264" | "avc" => Ok(CameraFormat::H264),
            _ => Err(ArvosError::camera_decode(s, "unsupported camera format")),
        }
    }
}

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    #[serde(alias = "focalX")]
    pub fx: f64,
    #[serde(alias = "focalY")]
    pub fy: f64,
    #[serde(alias = "principalX")]
    pub cx: f64,
    #[serde(alias = "principalY")]
    pub cy: f64,
}

/// One camera frame.
///
/// `data` always holds the compressed payload exactly as received. `image`
/// holds the decoded RGB pixels when the decoder was asked to decode them.
#[derive(Clone, PartialEq)]
pub struct CameraFrame {
    pub timestamp_ns: u64,
    pub width: u32,
    pub height: u32,
    pub format: CameraFormat,
    pub data: Bytes,
    pub intrinsics: Option<CameraIntrinsics>,
    pub image: Option<Arc<RgbImage>>,
}

impl CameraFrame {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }

    /// Size of the compressed payload in KiB.
    pub fn size_kb(&self) -> f64 {
        self.data.len() as f64 / 1024.0
    }

    /// Decoded pixels, if available.
    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_deref()
    }
}

impl fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFrame")
            .field("timestamp_ns", &self.timestamp_ns)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .field("intrinsics", &self.intrinsics)
            .field("decoded", &self.image.is_some())
            .finish()
    }
}
