//! Depth frame and point record types
//!
//! Point-cloud payloads are a flat array of little-endian records:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬────┬────┬────┐
//! │ x: f32   │ y: f32   │ z: f32   │ r  │ g  │ b  │
//! │ 4 bytes  │ 4 bytes  │ 4 bytes  │ u8 │ u8 │ u8 │
//! └──────────┴──────────┴──────────┴────┴────┴────┘
//! ```
//!
//! [`DepthFrame::data`] always holds records in this canonical 15-byte layout.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::slice::ChunksExact;
use std::str::FromStr;

use super::telemetry::ns_to_seconds;
use crate::ArvosError;

/// Size of one canonical point record in bytes.
pub const POINT_RECORD_SIZE: usize = 15;

/// Payload layout of a depth frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    /// Undecoded depth map, passed through as-is.
    RawDepth,
    /// Array of point records.
    PointCloud,
}

impl DepthFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DepthFormat::RawDepth => "raw_depth",
            DepthFormat::PointCloud => "point_cloud",
        }
    }
}

impl fmt::Display for DepthFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepthFormat {
    type Err = ArvosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "raw_depth" | "rawdepth" | "raw" => Ok(DepthFormat::RawDepth),
            "point_cloud" | "pointcloud" | "ply" => Ok(DepthFormat::PointCloud),
            other => Err(ArvosError::invalid_header(
                "depth",
                format!("unsupported depth format '{}'", other),
            )),
        }
    }
}

/// One coloured point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Point {
    /// Read a point from the first 15 bytes of `record`.
    ///
    /// Returns `None` if `record` is shorter than [`POINT_RECORD_SIZE`].
    /// Bytes past the first 15 are ignored.
    pub fn from_record(record: &[u8]) -> Option<Self> {
        let record: &[u8; POINT_RECORD_SIZE] = record.get(..POINT_RECORD_SIZE)?.try_into().ok()?;
        let f32_at = |offset: usize| {
            f32::from_le_bytes([
                record[offset],
                record[offset + 1],
                record[offset + 2],
                record[offset + 3],
            ])
        };

        Some(Self { x: f32_at(0), y: f32_at(4), z: f32_at(8), r: record[12], g: record[13], b: record[14] })
    }

    /// Append the canonical 15-byte encoding of this point.
    pub fn write_record(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.x.to_le_bytes());
        out.extend_from_slice(&self.y.to_le_bytes());
        out.extend_from_slice(&self.z.to_le_bytes());
        out.extend_from_slice(&[self.r, self.g, self.b]);
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance from the sensor origin.
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One depth/LiDAR frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub timestamp_ns: u64,
    /// Number of points that survived decoding and filtering.
    pub point_count: u32,
    pub min_depth: f32,
    pub max_depth: f32,
    pub format: DepthFormat,
    pub data: Bytes,
}

impl DepthFrame {
    pub fn timestamp_s(&self) -> f64 {
        ns_to_seconds(self.timestamp_ns)
    }

    pub fn size_kb(&self) -> f64 {
        self.data.len() as f64 / 1024.0
    }

    /// Iterate the points of this frame.
    ///
    /// Every call starts a fresh pass over `data`; nothing is cached.
    /// Raw depth frames yield no points.
    pub fn point_cloud(&self) -> PointCloud<'_> {
        let records: &[u8] = match self.format {
            DepthFormat::PointCloud => &self.data,
            DepthFormat::RawDepth => &[],
        };
        PointCloud { records: records.chunks_exact(POINT_RECORD_SIZE) }
    }
}

/// Iterator over the points of a [`DepthFrame`].
#[derive(Debug, Clone)]
pub struct PointCloud<'a> {
    records: ChunksExact<'a, u8>,
}

impl Iterator for PointCloud<'_> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        self.records.next().and_then(Point::from_record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for PointCloud<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_from(points: &[Point], format: DepthFormat) -> DepthFrame {
        let mut data = Vec::new();
        for point in points {
            point.write_record(&mut data);
        }
        DepthFrame {
            timestamp_ns: 0,
            point_count: points.len() as u32,
            min_depth: 0.0,
            max_depth: 5.0,
            format,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn point_record_layout_is_little_endian() {
        let point = Point { x: 1.0, y: -2.0, z: 0.5, r: 10, g: 20, b: 30 };
        let mut out = Vec::new();
        point.write_record(&mut out);

        assert_eq!(out.len(), POINT_RECORD_SIZE);
        assert_eq!(&out[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&out[12..15], &[10, 20, 30]);
        assert_eq!(Point::from_record(&out), Some(point));
    }

    #[test]
    fn short_records_are_rejected() {
        let mut out = Vec::new();
        Point { x: 1.0, y: 2.0, z: 3.0, r: 0, g: 0, b: 0 }.write_record(&mut out);

        assert_eq!(Point::from_record(&out[..POINT_RECORD_SIZE - 1]), None);
        assert_eq!(Point::from_record(&[]), None);

        out.extend_from_slice(&[0xAA; 4]);
        assert_eq!(Point::from_record(&out).map(|p| p.z), Some(3.0));
    }

    #[test]
    fn point_cloud_is_restartable() {
        let points = [
            Point { x: 0.0, y: 0.0, z: 1.0, r: 1, g: 2, b: 3 },
            Point { x: 0.5, y: 0.5, z: 2.0, r: 4, g: 5, b: 6 },
        ];
        let frame = frame_from(&points, DepthFormat::PointCloud);

        let first: Vec<_> = frame.point_cloud().collect();
        let second: Vec<_> = frame.point_cloud().collect();
        assert_eq!(first, points);
        assert_eq!(first, second);
        assert_eq!(frame.point_cloud().len(), 2);
    }

    #[test]
    fn raw_depth_frames_have_no_points() {
        let points = [Point { x: 0.0, y: 0.0, z: 1.0, r: 1, g: 2, b: 3 }];
        let frame = frame_from(&points, DepthFormat::RawDepth);
        assert_eq!(frame.point_cloud().count(), 0);
    }

    #[test]
    fn depth_format_aliases() {
        assert_eq!("point_cloud".parse::<DepthFormat>().unwrap(), DepthFormat::PointCloud);
        assert_eq!("ply".parse::<DepthFormat>().unwrap(), DepthFormat::PointCloud);
        assert_eq!("raw-depth".parse::<DepthFormat>().unwrap(), DepthFormat::RawDepth);
        assert!("voxels".parse::<DepthFormat>().is_err());
    }
}
