//! Types for debayering operations

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3};

use crate::image_pipeline::common::error::ConversionError;

/// Photosite filter color within a 2x2 Bayer tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfaSite {
    Red,
    /// Green sharing a row with red
    GreenR,
    /// Green sharing a row with blue
    GreenB,
    Blue,
}

impl CfaSite {
    /// Output channel index (0=R, 1=G, 2=B)
    pub fn channel(self) -> usize {
        match self {
            CfaSite::Red => 0,
            CfaSite::GreenR | CfaSite::GreenB => 1,
            CfaSite::Blue => 2,
        }
    }
}

/// Bayer pattern types, named by the top-left 2x2 tile read row by row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BayerPattern {
    RGGB,
    BGGR,
    GRBG,
    GBRG,
}

impl BayerPattern {
    pub const ALL: [BayerPattern; 4] = [
        BayerPattern::RGGB,
        BayerPattern::BGGR,
        BayerPattern::GRBG,
        BayerPattern::GBRG,
    ];

    /// Tile layout indexed `[row % 2][col % 2]`
    pub fn tile(self) -> [[CfaSite; 2]; 2] {
        use CfaSite::*;
        match self {
            BayerPattern::RGGB => [[Red, GreenR], [GreenB, Blue]],
            BayerPattern::BGGR => [[Blue, GreenB], [GreenR, Red]],
            BayerPattern::GRBG => [[GreenR, Red], [Blue, GreenB]],
            BayerPattern::GBRG => [[GreenB, Blue], [Red, GreenR]],
        }
    }

    #[inline]
    pub fn site_at(self, row: usize, col: usize) -> CfaSite {
        self.tile()[row & 1][col & 1]
    }

    /// Pattern seen by a window whose origin is offset by `(dy, dx)` sites.
    pub fn shifted(self, dy: usize, dx: usize) -> Self {
        use BayerPattern::*;
        // a row shift swaps R/B rows with G rows, a column shift swaps within rows
        let by_row = |p: BayerPattern| match p {
            RGGB => GBRG,
            GBRG => RGGB,
            BGGR => GRBG,
            GRBG => BGGR,
        };
        let by_col = |p: BayerPattern| match p {
            RGGB => GRBG,
            GRBG => RGGB,
            BGGR => GBRG,
            GBRG => BGGR,
        };
        let pattern = if dy % 2 == 1 { by_row(self) } else { self };
        if dx % 2 == 1 { by_col(pattern) } else { pattern }
    }

    /// Pattern after flipping a frame of `height` rows upside down.
    pub fn flipped_vertically(self, height: usize) -> Self {
        if height % 2 == 0 { self.shifted(1, 0) } else { self }
    }
}

impl FromStr for BayerPattern {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RGGB" => Ok(BayerPattern::RGGB),
            "BGGR" => Ok(BayerPattern::BGGR),
            "GRBG" => Ok(BayerPattern::GRBG),
            "GBRG" => Ok(BayerPattern::GBRG),
            _ => Err(ConversionError::InvalidParameter(format!(
                "{s:?} is not a valid Bayer pattern"
            ))),
        }
    }
}

impl fmt::Display for BayerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BayerPattern::RGGB => "RGGB",
            BayerPattern::BGGR => "BGGR",
            BayerPattern::GRBG => "GRBG",
            BayerPattern::GBRG => "GBRG",
        };
        f.write_str(name)
    }
}

/// Reconstruction algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionMode {
    /// Sparse RGB: each site keeps only its own channel, green halved
    Mosaic,
    /// Fill missing sites from the mean of adjacent samples (GBRG only)
    Neighbor,
    /// 3x3 convolution bilinear interpolation
    Bilinear,
}

impl FromStr for ReconstructionMode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mosaic" => Ok(ReconstructionMode::Mosaic),
            "neighbor" | "neighbors" => Ok(ReconstructionMode::Neighbor),
            "bilinear" => Ok(ReconstructionMode::Bilinear),
            _ => Err(ConversionError::InvalidParameter(format!(
                "{s:?} is not a valid reconstruction mode"
            ))),
        }
    }
}

impl fmt::Display for ReconstructionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconstructionMode::Mosaic => "mosaic",
            ReconstructionMode::Neighbor => "neighbor",
            ReconstructionMode::Bilinear => "bilinear",
        };
        f.write_str(name)
    }
}

/// How the bilinear kernels read samples outside the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// Repeat the edge sample
    #[default]
    Nearest,
    /// Reflect about the edge sample without repeating it (`-1 -> 1`),
    /// which keeps the Bayer phase of every neighbor intact
    Mirror,
}

impl FromStr for Boundary {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Boundary::Nearest),
            "mirror" => Ok(Boundary::Mirror),
            _ => Err(ConversionError::InvalidParameter(format!(
                "{s:?} is not a valid boundary mode"
            ))),
        }
    }
}

/// Per-color site masks for one pattern and frame shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMask {
    pub red: Array2<bool>,
    pub green_r: Array2<bool>,
    pub green_b: Array2<bool>,
    pub blue: Array2<bool>,
}

impl ChannelMask {
    pub(crate) fn empty(height: usize, width: usize) -> Self {
        Self {
            red: Array2::from_elem((height, width), false),
            green_r: Array2::from_elem((height, width), false),
            green_b: Array2::from_elem((height, width), false),
            blue: Array2::from_elem((height, width), false),
        }
    }

    pub fn plane(&self, site: CfaSite) -> &Array2<bool> {
        match site {
            CfaSite::Red => &self.red,
            CfaSite::GreenR => &self.green_r,
            CfaSite::GreenB => &self.green_b,
            CfaSite::Blue => &self.blue,
        }
    }

    pub(crate) fn plane_mut(&mut self, site: CfaSite) -> &mut Array2<bool> {
        match site {
            CfaSite::Red => &mut self.red,
            CfaSite::GreenR => &mut self.green_r,
            CfaSite::GreenB => &mut self.green_b,
            CfaSite::Blue => &mut self.blue,
        }
    }

    /// Union of both green masks
    pub fn green(&self) -> Array2<bool> {
        let mut green = self.green_r.clone();
        green.zip_mut_with(&self.green_b, |g, &b| *g |= b);
        green
    }

    /// Which filter color covers `(row, col)`
    pub fn site_at(&self, row: usize, col: usize) -> Option<CfaSite> {
        [CfaSite::Red, CfaSite::GreenR, CfaSite::GreenB, CfaSite::Blue]
            .into_iter()
            .find(|&site| self.plane(site)[[row, col]])
    }

    pub fn dim(&self) -> (usize, usize) {
        self.red.dim()
    }
}

/// Whether every site of every channel carries a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Only the source-pattern sites are populated, others are zero
    Sparse,
    /// Missing sites were interpolated
    Dense,
}

/// RGB image after debayering
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedImage {
    /// Samples indexed `[row, column, channel]` with channels R, G, B
    pub data: Array3<u16>,
    pub kind: ImageKind,
    /// Bits per sample inherited from the source frame
    pub bits_per_sample: u32,
}

impl ReconstructedImage {
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Samples interleaved `[R, G, B, R, G, B, ...]` row by row
    pub fn interleaved(&self) -> Vec<u16> {
        self.data.iter().copied().collect()
    }
}
