//! TIFF conversion configuration types

use std::str::FromStr;

use crate::image_pipeline::common::error::ConversionError;
use crate::image_pipeline::debayer::{BayerPattern, Boundary, ReconstructionMode};

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

impl FromStr for TiffCompression {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TiffCompression::None),
            "lzw" => Ok(TiffCompression::Lzw),
            "deflate-fast" => Ok(TiffCompression::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(TiffCompression::DeflateBalanced),
            "deflate-best" => Ok(TiffCompression::DeflateBest),
            other => Err(ConversionError::InvalidParameter(format!(
                "unknown TIFF compression {other:?}"
            ))),
        }
    }
}

/// Configuration for RAW to TIFF conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Whether to validate image dimensions before conversion
    pub validate_dimensions: bool,
    /// Whether to debayer the image to RGB (true) or output grayscale Bayer (false)
    pub debayer: bool,
    /// Color filter layout of the incoming frames
    pub pattern: BayerPattern,
    /// Reconstruction used when debayering
    pub mode: ReconstructionMode,
    /// Edge handling for bilinear reconstruction
    pub boundary: Boundary,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            validate_dimensions: true,
            debayer: false,
            pattern: BayerPattern::RGGB,
            mode: ReconstructionMode::Bilinear,
            boundary: Boundary::Nearest,
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
    debayer: Option<bool>,
    pattern: Option<BayerPattern>,
    mode: Option<ReconstructionMode>,
    boundary: Option<Boundary>,
}

impl ConversionConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn debayer(mut self, enable: bool) -> Self {
        self.debayer = Some(enable);
        self
    }

    pub fn pattern(mut self, pattern: BayerPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn mode(mut self, mode: ReconstructionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            debayer: self.debayer.unwrap_or(default.debayer),
            pattern: self.pattern.unwrap_or(default.pattern),
            mode: self.mode.unwrap_or(default.mode),
            boundary: self.boundary.unwrap_or(default.boundary),
        }
    }
}
