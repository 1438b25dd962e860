//! Wire formats shared by every transport.
//!
//! - [`envelope`]: the `[u32 LE header length][JSON header][payload]` framing
//!   used by camera and depth frames
//! - [`telemetry`]: flat JSON messages discriminated by `type`
//! - [`reassembly`]: recovery of length-prefixed messages from chunked streams
//!
//! Everything here is synchronous and performs no I/O.
//!
//! ## Usage Example
//!
//! ```rust
//! use arvos::wire::{encode_envelope, parse_envelope};
//! use serde_json::json;
//!
//! let header = json!({"type": "depth", "pointCount": 0}).as_object().cloned().unwrap();
//! let buffer = encode_envelope(&header, &[])?;
//!
//! let envelope = parse_envelope(&buffer)?;
//! assert_eq!(envelope.message_type(), Some("depth"));
//! assert!(envelope.payload.is_empty());
//! # Ok::<(), arvos::ArvosError>(())
//! ```

pub mod envelope;
pub mod reassembly;
pub mod telemetry;

pub use envelope::{Envelope, LENGTH_PREFIX_SIZE, encode_envelope, parse_envelope};
pub use reassembly::{StreamReassembler, frame_message};
pub use telemetry::{parse_telemetry, parse_telemetry_slice, parse_telemetry_value};
