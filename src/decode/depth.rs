//! Depth frame decoder
//!
//! The producer writes the header and the point buffer in two separate
//! calls, and the point cloud can change in between. The declared
//! `pointCount` and the payload length therefore often disagree, and the
//! payload may end in a partial record. Decoding trusts the payload:
//!
//! 1. Truncate the payload to a whole number of records
//! 2. Read each record (`x, y, z: f32 LE`, `r, g, b: u8`, optional confidence)
//! 3. Drop points with a non-finite coordinate or too low a confidence
//!
//! None of these corrections is an error. They are reported in a
//! [`DepthDecodeReport`] so callers can count them.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::types::{DepthFormat, DepthFrame, POINT_RECORD_SIZE, Point};
use crate::{ArvosError, Result};

/// Byte offset of the optional confidence value inside a record.
pub const CONFIDENCE_OFFSET: usize = POINT_RECORD_SIZE;

/// Smallest record that can carry a confidence value.
pub const CONFIDENCE_RECORD_SIZE: usize = CONFIDENCE_OFFSET + 4;

/// JSON header of a depth envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthHeader {
    #[serde(default)]
    pub timestamp_ns: u64,
    #[serde(default)]
    pub point_count: u32,
    #[serde(default)]
    pub min_depth: f32,
    #[serde(default)]
    pub max_depth: f32,
    #[serde(default = "default_depth_format")]
    pub format: String,
    /// Padded record size, if the producer uses one.
    #[serde(default)]
    pub record_size: Option<usize>,
    /// Records carry an f32 confidence after the colour bytes.
    #[serde(default)]
    pub has_confidence: bool,
}

fn default_depth_format() -> String {
    DepthFormat::PointCloud.as_str().to_string()
}

impl DepthHeader {
    pub fn from_map(header: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(header))
            .map_err(|e| ArvosError::invalid_header("depth", e.to_string()))
    }

    /// Record size after validating it against the declared layout.
    pub fn layout(&self) -> Result<RecordLayout> {
        let minimum = if self.has_confidence { CONFIDENCE_RECORD_SIZE } else { POINT_RECORD_SIZE };
        let record_size = self.record_size.unwrap_or(minimum);

        if record_size < minimum {
            return Err(ArvosError::invalid_header(
                "depth",
                format!("recordSize {} is smaller than the {} byte point layout", record_size, minimum),
            ));
        }

        Ok(RecordLayout {
            record_size,
            confidence_offset: self.has_confidence.then_some(CONFIDENCE_OFFSET),
        })
    }
}

/// Shape of one record in a point-cloud payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub record_size: usize,
    pub confidence_offset: Option<usize>,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self { record_size: POINT_RECORD_SIZE, confidence_offset: None }
    }
}

impl RecordLayout {
    fn is_canonical(&self) -> bool {
        self.record_size == POINT_RECORD_SIZE
    }

    fn confidence(&self, record: &[u8]) -> Option<f32> {
        let offset = self.confidence_offset?;
        let bytes = record.get(offset..offset + 4)?;
        Some(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Soft corrections applied while decoding one depth frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthDecodeReport {
    /// `pointCount` from the header.
    pub declared_count: u32,
    /// Whole records present in the payload.
    pub usable_records: usize,
    pub trailing_bytes_discarded: usize,
    pub dropped_non_finite: usize,
    pub dropped_low_confidence: usize,
}

impl DepthDecodeReport {
    /// The payload did not end on a record boundary.
    pub fn misaligned(&self) -> bool {
        self.trailing_bytes_discarded > 0
    }

    /// The header's point count disagrees with the payload.
    pub fn count_mismatch(&self) -> bool {
        self.declared_count as usize != self.usable_records
    }

    pub fn dropped(&self) -> usize {
        self.dropped_non_finite + self.dropped_low_confidence
    }
}

/// A decoded depth frame with the corrections that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDepth {
    pub frame: DepthFrame,
    pub report: DepthDecodeReport,
}

/// Drop a trailing partial record.
///
/// Idempotent: an aligned payload is returned unchanged.
pub fn truncate_to_record_boundary(payload: &Bytes, record_size: usize) -> Bytes {
    if record_size == 0 {
        return payload.clone();
    }
    let aligned = payload.len() - payload.len() % record_size;
    payload.slice(..aligned)
}

/// Turns depth envelopes into [`DepthFrame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthDecoder {
    confidence_threshold: f32,
}

impl DepthDecoder {
    /// Points whose confidence is below `confidence_threshold` are dropped.
    /// A threshold of `0.0` disables confidence filtering.
    pub fn new(confidence_threshold: f32) -> Self {
        Self { confidence_threshold }
    }

    pub fn decode(&self, header: DepthHeader, payload: Bytes) -> Result<DecodedDepth> {
        let format: DepthFormat = header.format.parse()?;
        let layout = header.layout()?;

        let mut report = DepthDecodeReport { declared_count: header.point_count, ..Default::default() };

        if format == DepthFormat::RawDepth {
            let frame = DepthFrame {
                timestamp_ns: header.timestamp_ns,
                point_count: header.point_count,
                min_depth: header.min_depth,
                max_depth: header.max_depth,
                format,
                data: payload,
            };
            return Ok(DecodedDepth { frame, report });
        }

        let aligned = truncate_to_record_boundary(&payload, layout.record_size);
        report.usable_records = aligned.len() / layout.record_size;
        report.trailing_bytes_discarded = payload.len() - aligned.len();

        if report.misaligned() {
            debug!(
                "Depth payload of {} bytes is not a multiple of {}; discarded {} trailing bytes",
                payload.len(),
                layout.record_size,
                report.trailing_bytes_discarded
            );
        }
        if report.count_mismatch() {
            debug!(
                "Depth header declares {} points, payload holds {}",
                report.declared_count, report.usable_records
            );
        }

        let data = self.filter_records(&aligned, layout, &mut report);
        let point_count = u32::try_from(report.usable_records - report.dropped()).map_err(|_| {
            ArvosError::invalid_header("depth", "point count does not fit in 32 bits")
        })?;

        trace!(
            "Decoded depth frame: {} points ({} dropped)",
            point_count,
            report.dropped()
        );

        let frame = DepthFrame {
            timestamp_ns: header.timestamp_ns,
            point_count,
            min_depth: header.min_depth,
            max_depth: header.max_depth,
            format,
            data,
        };
        Ok(DecodedDepth { frame, report })
    }

    /// Surviving points in the canonical record layout.
    ///
    /// A canonical payload with nothing dropped is returned as the same
    /// buffer. Otherwise survivors are copied out.
    fn filter_records(
        &self,
        aligned: &Bytes,
        layout: RecordLayout,
        report: &mut DepthDecodeReport,
    ) -> Bytes {
        let mut survivors: Option<Vec<u8>> = (!layout.is_canonical())
            .then(|| Vec::with_capacity(report.usable_records * POINT_RECORD_SIZE));

        for (index, record) in aligned.chunks_exact(layout.record_size).enumerate() {
            let point = Point::from_record(record);

            let keep = if !point.is_some_and(|point| point.is_finite()) {
                report.dropped_non_finite += 1;
                false
            } else if !self.passes_confidence(layout.confidence(record)) {
                report.dropped_low_confidence += 1;
                false
            } else {
                true
            };

            if let Some(out) = survivors.as_mut() {
                if let (true, Some(point)) = (keep, point) {
                    point.write_record(out);
                }
            } else if !keep {
                // First drop in a canonical payload: copy everything kept so far.
                survivors = Some(aligned[..index * POINT_RECORD_SIZE].to_vec());
            }
        }

        survivors.map(Bytes::from).unwrap_or_else(|| aligned.clone())
    }

    fn passes_confidence(&self, confidence: Option<f32>) -> bool {
        match confidence {
            Some(confidence) if self.confidence_threshold > 0.0 => confidence >= self.confidence_threshold,
            _ => true,
        }
    }
}
