//! Camera frame decoder

use bytes::Bytes;
use image::ImageFormat;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::types::{CameraFormat, CameraFrame, CameraIntrinsics};
use crate::{ArvosError, Result};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// JSON header of a camera envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraHeader {
    #[serde(default)]
    pub timestamp_ns: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub format: String,
    /// Length of the compressed payload. When absent the whole payload is used.
    #[serde(default)]
    pub compressed_size: Option<usize>,
    #[serde(default)]
    pub intrinsics: Option<CameraIntrinsics>,
}

impl CameraHeader {
    pub fn from_map(header: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(header))
            .map_err(|e| ArvosError::invalid_header("camera", e.to_string()))
    }
}

/// Turns camera envelopes into [`CameraFrame`]s.
#[derive(Debug, Clone, Copy)]
pub struct CameraDecoder {
    decode_pixels: bool,
}

impl Default for CameraDecoder {
    fn default() -> Self {
        Self { decode_pixels: true }
    }
}

impl CameraDecoder {
    /// With `decode_pixels` off, JPEG payloads are only checked for a start
    /// marker and the frame carries no RGB image.
    pub fn new(decode_pixels: bool) -> Self {
        Self { decode_pixels }
    }

    pub fn decode(&self, header: CameraHeader, payload: Bytes) -> Result<CameraFrame> {
        let format: CameraFormat = header.format.parse()?;
        let data = trim_to_declared(format, header.compressed_size, payload)?;

        if data.is_empty() {
            return Err(ArvosError::camera_decode(format.as_str(), "empty payload"));
        }

        let mut frame = CameraFrame {
            timestamp_ns: header.timestamp_ns,
            width: header.width,
            height: header.height,
            format,
            data,
            intrinsics: header.intrinsics,
            image: None,
        };

        match format {
            CameraFormat::Jpeg => self.decode_jpeg(&mut frame)?,
            CameraFormat::H264 => check_annex_b(&frame.data)?,
        }

        trace!(
            "Decoded {} camera frame {}x{} ({:.1} KB)",
            format,
            frame.width,
            frame.height,
            frame.size_kb()
        );
        Ok(frame)
    }

    fn decode_jpeg(&self, frame: &mut CameraFrame) -> Result<()> {
        if !frame.data.starts_with(&JPEG_SOI) {
            return Err(ArvosError::camera_decode("jpeg", "missing JPEG start-of-image marker"));
        }

        if !self.decode_pixels {
            return Ok(());
        }

        let image = image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)
            .map_err(|e| {
                ArvosError::camera_decode_with_source("jpeg", "codec rejected payload", Box::new(e))
            })?
            .into_rgb8();

        if (image.width(), image.height()) != (frame.width, frame.height) {
            debug!(
                "JPEG is {}x{} but header declares {}x{}",
                image.width(),
                image.height(),
                frame.width,
                frame.height
            );
            frame.width = image.width();
            frame.height = image.height();
        }

        frame.image = Some(Arc::new(image));
        Ok(())
    }
}

/// Cut the payload to `compressedSize`; a shorter payload is an error.
fn trim_to_declared(format: CameraFormat, declared: Option<usize>, payload: Bytes) -> Result<Bytes> {
    let Some(declared) = declared else {
        return Ok(payload);
    };

    if payload.len() < declared {
        return Err(ArvosError::camera_decode(
            format.as_str(),
            format!("payload has {} bytes but compressedSize is {}", payload.len(), declared),
        ));
    }

    if payload.len() > declared {
        debug!("Discarding {} bytes after the declared camera payload", payload.len() - declared);
        return Ok(payload.slice(..declared));
    }

    Ok(payload)
}

fn check_annex_b(data: &[u8]) -> Result<()> {
    if data.starts_with(&[0, 0, 1]) || data.starts_with(&[0, 0, 0, 1]) {
        Ok(())
    } else {
        Err(ArvosError::camera_decode("h264", "missing Annex-B start code"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::jpeg_bytes;

    fn header(format: &str, width: u32, height: u32, size: Option<usize>) -> CameraHeader {
        CameraHeader {
            timestamp_ns: 1,
            width,
            height,
            format: format.to_string(),
            compressed_size: size,
            intrinsics: None,
        }
    }

    #[test]
    fn jpeg_is_decoded_to_rgb() {
        let jpeg = jpeg_bytes(8, 4);
        let frame = CameraDecoder::default()
            .decode(header("jpeg", 8, 4, Some(jpeg.len())), jpeg.clone())
            .unwrap();

        assert_eq!(frame.data, jpeg);
        let image = frame.image().unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
    }

    #[test]
    fn decoded_dimensions_override_header() {
        let jpeg = jpeg_bytes(8, 4);
        let frame = CameraDecoder::default().decode(header("jpeg", 1920, 1080, None), jpeg).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
    }

    #[test]
    fn invalid_jpeg_is_a_decode_error() {
        let err = CameraDecoder::default()
            .decode(header("jpeg", 2, 2, Some(4)), Bytes::from_static(&[1, 2, 3, 4]))
            .unwrap_err();
        assert_eq!(err.code(), "camera_decode_error");
    }

    #[test]
    fn corrupt_jpeg_body_is_a_decode_error_with_source() {
        let payload = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0x00, 0x13, 0x37]);
        let err = CameraDecoder::default().decode(header("jpeg", 2, 2, None), payload).unwrap_err();
        assert!(matches!(err, ArvosError::CameraDecode { source: Some(_), .. }));
    }

    #[test]
    fn pixel_decoding_can_be_skipped() {
        let payload = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let frame = CameraDecoder::new(false).decode(header("jpeg", 2, 2, Some(4)), payload).unwrap();
        assert!(frame.image().is_none());
        assert_eq!((frame.width, frame.height), (2, 2));
    }

    #[test]
    fn payload_is_cut_to_compressed_size() {
        let payload = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9, 0xAA, 0xBB]);
        let frame = CameraDecoder::new(false).decode(header("jpeg", 2, 2, Some(4)), payload).unwrap();
        assert_eq!(frame.data.len(), 4);
    }

    #[test]
    fn short_payload_is_rejected() {
        let payload = Bytes::from_static(&[0xFF, 0xD8]);
        let err = CameraDecoder::new(false).decode(header("jpeg", 2, 2, Some(10)), payload).unwrap_err();
        assert!(err.to_string().contains("compressedSize"));
    }

    #[test]
    fn h264_passes_through_after_start_code_check() {
        let payload = Bytes::from_static(&[0, 0, 0, 1, 0x67, 0x42]);
        let frame = CameraDecoder::default().decode(header("h264", 1280, 720, None), payload).unwrap();
        assert_eq!(frame.format, CameraFormat::H264);
        assert!(frame.image().is_none());

        let err = CameraDecoder::default()
            .decode(header("h264", 1280, 720, None), Bytes::from_static(&[9, 9, 9, 9]))
            .unwrap_err();
        assert_eq!(err.code(), "camera_decode_error");
    }

    #[test]
    fn unknown_format_and_empty_payload_are_rejected() {
        let err = CameraDecoder::default()
            .decode(header("png", 1, 1, None), Bytes::from_static(&[1]))
            .unwrap_err();
        assert_eq!(err.code(), "camera_decode_error");

        let err = CameraDecoder::default().decode(header("jpeg", 1, 1, None), Bytes::new()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn header_requires_format() {
        let map = serde_json::json!({"type": "camera", "width": 2}).as_object().cloned().unwrap();
        let err = CameraHeader::from_map(map).unwrap_err();
        assert_eq!(err.code(), "invalid_header");
    }

    #[test]
    fn header_reads_intrinsics_aliases() {
        let map = serde_json::json!({
            "format": "jpeg",
            "intrinsics": {"focalX": 500.0, "focalY": 500.0, "principalX": 320.0, "principalY": 240.0},
        })
        .as_object()
        .cloned()
        .unwrap();
        let header = CameraHeader::from_map(map).unwrap();
        assert_eq!(header.intrinsics.unwrap().cx, 320.0);
    }
}
