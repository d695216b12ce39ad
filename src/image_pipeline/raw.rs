//! RAW image reading module
//!
//! Decoding of headerless sensor buffers into single-channel frames.

mod decoder;
mod format;
mod packed_reader;
mod reader;
pub mod types;

pub use decoder::{decode, BYTES_PER_SAMPLE};
pub use format::RawFormat;
pub use packed_reader::PackedBufferReader;
pub use reader::RawImageReader;
pub use types::{PackingScheme, RawFrame};
