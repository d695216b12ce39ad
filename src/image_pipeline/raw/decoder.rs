//! Unpacking of raw sensor buffers into 16-bit samples.

use ndarray::Array2;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::types::{PackingScheme, RawFrame};

/// Every scheme stores one sample in exactly two bytes.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Decodes a packed sensor buffer into a `(height, width)` frame.
///
/// The buffer must hold exactly `width * height * 2` bytes. Values are not
/// masked or clamped to the nominal bit depth; black point and white level
/// handling is left to the caller.
pub fn decode(buffer: &[u8], width: usize, height: usize, scheme: PackingScheme) -> Result<RawFrame> {
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE))
        .ok_or(ConversionError::MalformedBuffer {
            expected: usize::MAX,
            actual: buffer.len(),
        })?;

    if buffer.len() != expected {
        return Err(ConversionError::MalformedBuffer {
            expected,
            actual: buffer.len(),
        });
    }

    debug!(width, height, %scheme, bytes = buffer.len(), "Decoding raw buffer");

    let samples: Vec<u16> = match scheme {
        PackingScheme::Packed12In16 => buffer
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| ((pair[1] as u16) << 8) | (pair[0] as u16 & 0xFF))
            .collect(),
        PackingScheme::Native16Le => buffer
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
    };

    let data = Array2::from_shape_vec((height, width), samples)
        .map_err(|_| ConversionError::InvalidDimensions(width, height))?;

    Ok(RawFrame::new(data, scheme.nominal_bits(), scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_zero_buffer_decodes_to_zero_frame() {
        let frame = decode(&[0u8; 4 * 3 * 2], 4, 3, PackingScheme::Native16Le).unwrap();
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.width(), 4);
        assert!(frame.data.iter().all(|&v| v == 0));
        assert_eq!(frame.bits_per_sample, 16);
    }

    #[test]
    fn packed_low_then_high_byte() {
        let frame = decode(&[0xFF, 0x0F, 0x34, 0x02], 2, 1, PackingScheme::Packed12In16).unwrap();
        assert_eq!(frame.data[[0, 0]], 0x0FFF);
        assert_eq!(frame.data[[0, 1]], 0x0234);
        assert_eq!(frame.bits_per_sample, 12);
    }

    #[test]
    fn native_reads_little_endian() {
        let frame = decode(&[0x01, 0x80, 0xFF, 0xFF], 1, 2, PackingScheme::Native16Le).unwrap();
        assert_eq!(frame.data[[0, 0]], 0x8001);
        assert_eq!(frame.data[[1, 0]], 0xFFFF);
    }

    #[test]
    fn samples_are_row_major() {
        let buffer: Vec<u8> = (0u16..6).flat_map(|v| v.to_le_bytes()).collect();
        let frame = decode(&buffer, 3, 2, PackingScheme::Native16Le).unwrap();
        assert_eq!(frame.data[[0, 2]], 2);
        assert_eq!(frame.data[[1, 0]], 3);
    }

    #[test]
    fn short_buffer_is_malformed() {
        let err = decode(&[0u8; 31], 4, 4, PackingScheme::Packed12In16).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::MalformedBuffer {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn long_buffer_is_malformed() {
        let err = decode(&[0u8; 34], 4, 4, PackingScheme::Native16Le).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedBuffer { .. }));
    }

    #[test]
    fn overflowing_dimensions_are_malformed() {
        let err = decode(&[0u8; 8], usize::MAX, 2, PackingScheme::Native16Le).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedBuffer { .. }));
    }

    #[test]
    fn values_are_not_masked_to_bit_depth() {
        let frame = decode(&[0xFF, 0xFF], 1, 1, PackingScheme::Packed12In16).unwrap();
        assert_eq!(frame.data[[0, 0]], 0xFFFF);
    }
}
