//! libcamera raw format names, e.g. `SRGGB12_CSI2P`.

use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::debayer::types::BayerPattern;
use crate::image_pipeline::raw::types::PackingScheme;

const CSI2_PACKED_SUFFIX: &str = "_CSI2P";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFormat {
    pub pattern: BayerPattern,
    pub bits: u32,
    /// Samples are packed MIPI CSI-2 style (1.5 bytes per 12-bit sample)
    pub csi2_packed: bool,
}

impl RawFormat {
    /// Same format with the CSI-2 packing removed, as requested from the
    /// camera so that every sample occupies two bytes.
    pub fn unpacked(self) -> Self {
        Self {
            csi2_packed: false,
            ..self
        }
    }

    /// Decoder scheme for buffers captured in this format.
    pub fn scheme(&self) -> Result<PackingScheme> {
        if self.csi2_packed {
            return Err(ConversionError::InvalidParameter(format!(
                "{self} is CSI-2 packed; configure the unpacked format {}",
                self.unpacked()
            )));
        }
        Ok(if self.bits >= 16 {
            PackingScheme::Native16Le
        } else {
            PackingScheme::Packed12In16
        })
    }

    /// Largest sample value for this bit depth.
    pub fn max_value(&self) -> u32 {
        (1u32 << self.bits) - 1
    }
}

impl FromStr for RawFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ConversionError::InvalidParameter(format!("unrecognized raw format {s:?}"));

        let (body, csi2_packed) = match s.strip_suffix(CSI2_PACKED_SUFFIX) {
            Some(body) => (body, true),
            None => (s, false),
        };
        let body = body.strip_prefix('S').ok_or_else(invalid)?;
        if body.len() < 5 || !body.is_char_boundary(4) {
            return Err(invalid());
        }
        let (order, bits) = body.split_at(4);
        let pattern: BayerPattern = order.parse().map_err(|_| invalid())?;
        let bits: u32 = bits.parse().map_err(|_| invalid())?;
        if !(8..=16).contains(&bits) {
            return Err(invalid());
        }

        Ok(Self {
            pattern,
            bits,
            csi2_packed,
        })
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}{}", self.pattern, self.bits)?;
        if self.csi2_packed {
            f.write_str(CSI2_PACKED_SUFFIX)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_packed_sensor_format() {
        let format: RawFormat = "SRGGB12_CSI2P".parse().unwrap();
        assert_eq!(format.pattern, BayerPattern::RGGB);
        assert_eq!(format.bits, 12);
        assert!(format.csi2_packed);
        assert_eq!(format.unpacked().to_string(), "SRGGB12");
    }

    #[test]
    fn packed_format_has_no_scheme() {
        let format: RawFormat = "SBGGR10_CSI2P".parse().unwrap();
        assert!(format.scheme().is_err());
        assert_eq!(format.unpacked().scheme().unwrap(), PackingScheme::Packed12In16);
    }

    #[test]
    fn sixteen_bit_format_is_native() {
        let format: RawFormat = "SGBRG16".parse().unwrap();
        assert_eq!(format.scheme().unwrap(), PackingScheme::Native16Le);
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["RGGB12", "SRGGB", "SRGXB12", "SRGGB4", "SRGGB12_MIPI", ""] {
            assert!(name.parse::<RawFormat>().is_err(), "{name} should not parse");
        }
    }

    #[test]
    fn white_level_follows_bit_depth() {
        let format: RawFormat = "SRGGB12".parse().unwrap();
        assert_eq!(format.max_value(), 4095);
        assert_eq!("SBGGR16".parse::<RawFormat>().unwrap().max_value(), 65535);
    }
}
