//! vvplay Media - point-cloud decoding and content probing
//!
//! This crate handles:
//! - The decoder seam the frame loader calls (PointCloudDecoder)
//! - A procedural decoder for demos and tests (SyntheticDecoder)
//! - Checking clips on disk before playback (probe_content)

pub mod decoder;
pub mod probe;

pub use decoder::{
    decode_frame, source_index_from_path, FailureMode, PointCloudDecoder, SyntheticDecoder,
};
pub use probe::{probe_content, ContentProbe};
