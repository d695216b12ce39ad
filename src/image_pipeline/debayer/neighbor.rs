//! Neighbor-average interpolation for GBRG sensors.
//!
//! In a GBRG mosaic blue sits on even rows / odd columns and red on odd rows /
//! even columns. Missing samples are filled from the mean of the two adjacent
//! samples of the same color; any site lacking one of them stays zero.

use ndarray::{Array2, Array3};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::debayer::types::{BayerPattern, ChannelMask, ReconstructionMode};

const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;

#[inline]
fn mean(a: u16, b: u16) -> u16 {
    ((a as u32 + b as u32) / 2) as u16
}

/// Fills the gaps of a sparse GBRG mosaic in place.
///
/// `rgb` must be the mosaic built from `raw` and `masks`; source-site samples
/// are left untouched.
pub(crate) fn fill_neighbors(
    raw: &Array2<u16>,
    rgb: &mut Array3<u16>,
    masks: &ChannelMask,
    pattern: BayerPattern,
) -> Result<()> {
    if pattern != BayerPattern::GBRG {
        return Err(ConversionError::UnsupportedPattern {
            pattern: pattern.to_string(),
            mode: ReconstructionMode::Neighbor.to_string(),
        });
    }

    let (height, width) = raw.dim();
    let mut red_known = masks.red.clone();
    let mut blue_known = masks.blue.clone();

    // green at red sites, from the greens above and below
    for row in (1..height.saturating_sub(1)).step_by(2) {
        for col in (0..width).step_by(2) {
            rgb[[row, col, GREEN]] = mean(raw[[row - 1, col]], raw[[row + 1, col]]);
        }
    }

    // green at blue sites, from the greens left and right
    for row in (0..height).step_by(2) {
        for col in (1..width.saturating_sub(1)).step_by(2) {
            rgb[[row, col, GREEN]] = mean(raw[[row, col - 1]], raw[[row, col + 1]]);
        }
    }

    // complete the red rows horizontally
    for row in (1..height).step_by(2) {
        for col in (1..width.saturating_sub(1)).step_by(2) {
            rgb[[row, col, RED]] = mean(raw[[row, col - 1]], raw[[row, col + 1]]);
            red_known[[row, col]] = true;
        }
    }

    // then the rows between them vertically
    for row in (2..height.saturating_sub(1)).step_by(2) {
        for col in 0..width {
            if red_known[[row - 1, col]] && red_known[[row + 1, col]] {
                rgb[[row, col, RED]] = mean(rgb[[row - 1, col, RED]], rgb[[row + 1, col, RED]]);
                red_known[[row, col]] = true;
            }
        }
    }

    // complete the blue columns vertically
    for col in (1..width).step_by(2) {
        for row in (1..height.saturating_sub(1)).step_by(2) {
            rgb[[row, col, BLUE]] = mean(raw[[row - 1, col]], raw[[row + 1, col]]);
            blue_known[[row, col]] = true;
        }
    }

    // then the columns between them horizontally
    for col in (2..width.saturating_sub(1)).step_by(2) {
        for row in 0..height {
            if blue_known[[row, col - 1]] && blue_known[[row, col + 1]] {
                rgb[[row, col, BLUE]] = mean(rgb[[row, col - 1, BLUE]], rgb[[row, col + 1, BLUE]]);
                blue_known[[row, col]] = true;
            }
        }
    }

    Ok(())
}
