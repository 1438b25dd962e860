//! Synthetic fixtures for tests and benchmarks
//!
//! Builders for the payloads the app produces: encoded JPEG frames, point
//! records and full binary envelopes. Everything is generated in memory.

#![cfg(any(test, feature = "benchmark"))]

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use std::io::Cursor;

use crate::decode::DepthHeader;
use crate::types::{DepthFormat, Point};
use crate::wire::encode_envelope;

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture header must be a JSON object, got {}", other),
    }
}

/// A real baseline JPEG of the given size with a colour gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Bytes {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .expect("in-memory JPEG encoding should not fail");
    Bytes::from(out)
}

/// Binary envelope with an arbitrary header and payload.
pub fn envelope(header: Value, payload: &[u8]) -> Bytes {
    encode_envelope(&object(header), payload).expect("fixture header should serialise")
}

/// Camera envelope carrying a decodable JPEG.
pub fn camera_envelope(width: u32, height: u32) -> Bytes {
    let jpeg = jpeg_bytes(width, height);
    envelope(
        json!({
            "type": "camera",
            "timestampNs": 1_000_000u64,
            "width": width,
            "height": height,
            "format": "jpeg",
            "compressedSize": jpeg.len(),
        }),
        &jpeg,
    )
}

/// Camera envelope whose payload is not a JPEG.
pub fn corrupt_camera_envelope() -> Bytes {
    envelope(
        json!({
            "type": "camera",
            "timestampNs": 1,
            "width": 2,
            "height": 2,
            "format": "jpeg",
            "compressedSize": 4,
        }),
        &[0xDE, 0xAD, 0xBE, 0xEF],
    )
}

/// `count` finite points on a spiral, with distinct colours.
pub fn sample_points(count: usize) -> Vec<Point> {
    (0..count)
        .map(|i| {
            let t = i as f32 * 0.1;
            Point {
                x: t.cos() * (1.0 + t),
                y: t.sin() * (1.0 + t),
                z: 0.5 + t,
                r: (i % 256) as u8,
                g: ((i * 7) % 256) as u8,
                b: ((i * 13) % 256) as u8,
            }
        })
        .collect()
}

/// Canonical 15-byte records for `points`.
pub fn depth_payload(points: &[Point]) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * crate::types::POINT_RECORD_SIZE);
    for point in points {
        point.write_record(&mut out);
    }
    out
}

/// Point-cloud depth header declaring `point_count` points.
pub fn depth_header(point_count: u32) -> DepthHeader {
    DepthHeader {
        timestamp_ns: 2_000_000,
        point_count,
        min_depth: 0.1,
        max_depth: 5.0,
        format: DepthFormat::PointCloud.as_str().to_string(),
        record_size: None,
        has_confidence: false,
    }
}

/// Depth envelope declaring `point_count` points around `payload`.
pub fn depth_envelope(point_count: u32, payload: &[u8]) -> Bytes {
    envelope(
        json!({
            "type": "depth",
            "timestampNs": 2_000_000u64,
            "pointCount": point_count,
            "minDepth": 0.1,
            "maxDepth": 5.0,
            "format": "point_cloud",
        }),
        payload,
    )
}

/// IMU telemetry JSON with the given timestamp.
pub fn imu_json(timestamp_ns: u64) -> String {
    json!({
        "type": "imu",
        "timestampNs": timestamp_ns,
        "angularVelocity": [0.01, -0.02, 0.03],
        "linearAcceleration": [0.0, 0.0, -9.81],
    })
    .to_string()
}

/// Handshake JSON for a LiDAR-capable phone.
pub fn handshake_json() -> String {
    json!({
        "type": "handshake",
        "deviceName": "Test iPhone",
        "deviceModel": "iPhone15,3",
        "osVersion": "17.2",
        "appVersion": "1.4.0",
        "capabilities": {
            "hasLiDAR": true,
            "hasARKit": true,
            "hasGPS": true,
            "hasIMU": true,
            "supportedModes": ["full_sensor", "rgbd"],
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::parse_envelope;

    #[test]
    fn jpeg_fixture_has_soi_marker() {
        let jpeg = jpeg_bytes(16, 16);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn camera_fixture_declares_its_size() {
        let envelope = parse_envelope(&camera_envelope(4, 4)).unwrap();
        assert_eq!(envelope.header["compressedSize"], json!(envelope.payload.len()));
    }

    #[test]
    fn sample_points_are_finite() {
        assert!(sample_points(500).iter().all(Point::is_finite));
    }
}
