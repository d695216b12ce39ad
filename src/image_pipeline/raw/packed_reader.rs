//! RAW reader for headerless sensor dumps.
//!
//! Sensor dumps carry no geometry of their own, so the reader is configured
//! with the frame size and packing scheme reported by the capture hardware.

use tracing::debug;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::decoder::decode;
use crate::image_pipeline::raw::reader::RawImageReader;
use crate::image_pipeline::raw::types::{PackingScheme, RawFrame};

/// Reads raw sensor buffers of a fixed geometry.
#[derive(Debug, Clone, Copy)]
pub struct PackedBufferReader {
    pub width: usize,
    pub height: usize,
    pub scheme: PackingScheme,
    /// Overrides the scheme's nominal bit depth when set
    pub bits_per_sample: Option<u32>,
}

impl PackedBufferReader {
    pub fn new(width: usize, height: usize, scheme: PackingScheme) -> Self {
        Self {
            width,
            height,
            scheme,
            bits_per_sample: None,
        }
    }

    pub fn with_bits_per_sample(mut self, bits: u32) -> Self {
        self.bits_per_sample = Some(bits);
        self
    }
}

impl RawImageReader for PackedBufferReader {
    fn read_raw(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Reading raw dump, {} bytes", data.len());

        let frame = decode(data, self.width, self.height, self.scheme)?;

        Ok(match self.bits_per_sample {
            Some(bits) => frame.with_bits_per_sample(bits),
            None => frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::ConversionError;

    #[test]
    fn reader_applies_bit_depth_override() {
        let reader = PackedBufferReader::new(2, 2, PackingScheme::Native16Le).with_bits_per_sample(10);
        let frame = reader.read_raw(&[0u8; 8]).unwrap();
        assert_eq!(frame.bits_per_sample, 10);
        assert_eq!(frame.max_value(), 1023);
    }

    #[test]
    fn reader_rejects_wrong_size() {
        let reader = PackedBufferReader::new(2, 2, PackingScheme::Packed12In16);
        assert!(matches!(
            reader.read_raw(&[0u8; 6]),
            Err(ConversionError::MalformedBuffer { expected: 8, actual: 6 })
        ));
    }
}
