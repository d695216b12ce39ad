//! RAW image data types

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::image_pipeline::common::error::ConversionError;

/// How each sample is laid out in the two bytes the sensor delivers per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingScheme {
    /// Low byte first, then the high bits of the sample (12-bit data in a 16-bit container)
    Packed12In16,
    /// Native little-endian 16-bit samples, value right-justified
    Native16Le,
}

impl PackingScheme {
    /// Nominal bit depth of samples produced by this scheme.
    pub fn nominal_bits(self) -> u32 {
        match self {
            PackingScheme::Packed12In16 => 12,
            PackingScheme::Native16Le => 16,
        }
    }
}

impl FromStr for PackingScheme {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "packed12in16" => Ok(PackingScheme::Packed12In16),
            "native16le" => Ok(PackingScheme::Native16Le),
            other => Err(ConversionError::InvalidParameter(format!(
                "unknown packing scheme {other:?}"
            ))),
        }
    }
}

impl fmt::Display for PackingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackingScheme::Packed12In16 => f.write_str("packed12in16"),
            PackingScheme::Native16Le => f.write_str("native16le"),
        }
    }
}

/// Decoded single-channel sensor frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Samples indexed `[row, column]`, shape `(height, width)`
    pub data: Array2<u16>,
    /// Meaningful bits per sample (e.g. 12 for the IMX477 in 12-bit mode)
    pub bits_per_sample: u32,
    /// Packing scheme the samples were decoded from
    pub scheme: PackingScheme,
}

impl RawFrame {
    pub fn new(data: Array2<u16>, bits_per_sample: u32, scheme: PackingScheme) -> Self {
        Self {
            data,
            bits_per_sample,
            scheme,
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Largest value representable with the declared bit depth.
    pub fn max_value(&self) -> u16 {
        if self.bits_per_sample >= 16 {
            u16::MAX
        } else {
            ((1u32 << self.bits_per_sample) - 1) as u16
        }
    }

    pub fn with_bits_per_sample(mut self, bits: u32) -> Self {
        self.bits_per_sample = bits;
        self
    }
}
