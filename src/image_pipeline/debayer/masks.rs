use ndarray::s;

use crate::image_pipeline::debayer::types::{BayerPattern, ChannelMask};

/// Builds the four filter-color masks for a `(height, width)` frame.
///
/// The pattern's 2x2 tile is repeated from the origin; an odd trailing row or
/// column simply receives the first half of a tile.
pub fn masks_for(pattern: BayerPattern, height: usize, width: usize) -> ChannelMask {
    let mut masks = ChannelMask::empty(height, width);

    for dy in 0..2 {
        for dx in 0..2 {
            if dy >= height || dx >= width {
                continue;
            }
            let site = pattern.site_at(dy, dx);
            masks.plane_mut(site).slice_mut(s![dy..;2, dx..;2]).fill(true);
        }
    }

    masks
}
