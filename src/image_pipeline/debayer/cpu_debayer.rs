use ndarray::{Array3, Axis};
use tracing::{debug, instrument};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::convolve::{convolve3x3, GREEN_KERNEL, RED_BLUE_KERNEL};
use crate::image_pipeline::debayer::masks::masks_for;
use crate::image_pipeline::debayer::neighbor::fill_neighbors;
use crate::image_pipeline::debayer::types::{
    BayerPattern, Boundary, ChannelMask, ImageKind, ReconstructedImage, ReconstructionMode,
};
use crate::image_pipeline::raw::RawFrame;

/// Reconstructs RGB images from single-channel Bayer frames on the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuDebayer {
    boundary: Boundary,
}

impl CpuDebayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boundary handling for the bilinear kernels
    pub fn with_boundary(boundary: Boundary) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    pub fn process(
        &self,
        frame: &RawFrame,
        pattern: BayerPattern,
        mode: ReconstructionMode,
    ) -> Result<ReconstructedImage> {
        let masks = masks_for(pattern, frame.height(), frame.width());

        let (data, kind) = match mode {
            ReconstructionMode::Mosaic => (sparse_rgb(frame, &masks, true), ImageKind::Sparse),
            ReconstructionMode::Neighbor => {
                let mut rgb = sparse_rgb(frame, &masks, true);
                fill_neighbors(&frame.data, &mut rgb, &masks, pattern)?;
                (rgb, ImageKind::Dense)
            }
            ReconstructionMode::Bilinear => {
                let sparse = sparse_rgb(frame, &masks, false);
                (self.bilinear(&sparse), ImageKind::Dense)
            }
        };

        debug!(%pattern, %mode, "Reconstruction complete");

        Ok(ReconstructedImage {
            data,
            kind,
            bits_per_sample: frame.bits_per_sample,
        })
    }

    fn bilinear(&self, sparse: &Array3<u16>) -> Array3<u16> {
        let mut dense = Array3::<u16>::zeros(sparse.dim());

        for channel in 0..3 {
            let kernel = if channel == 1 { &GREEN_KERNEL } else { &RED_BLUE_KERNEL };
            let smoothed = convolve3x3(sparse.index_axis(Axis(2), channel), kernel, self.boundary);
            dense
                .index_axis_mut(Axis(2), channel)
                .zip_mut_with(&smoothed, |out, &value| {
                    *out = value.floor().clamp(0.0, u16::MAX as f64) as u16;
                });
        }

        dense
    }
}

/// Reconstructs `frame` with the default boundary handling.
pub fn reconstruct(
    frame: &RawFrame,
    pattern: BayerPattern,
    mode: ReconstructionMode,
) -> Result<ReconstructedImage> {
    CpuDebayer::new().process(frame, pattern, mode)
}

/// Scatters every sample into its own channel, leaving the others zero.
///
/// Green samples are halved when `halve_green` is set, since a Bayer tile
/// holds two of them.
fn sparse_rgb(frame: &RawFrame, masks: &ChannelMask, halve_green: bool) -> Array3<u16> {
    let (height, width) = frame.data.dim();
    let mut rgb = Array3::<u16>::zeros((height, width, 3));

    for ((row, col), &value) in frame.data.indexed_iter() {
        if let Some(site) = masks.site_at(row, col) {
            let channel = site.channel();
            rgb[[row, col, channel]] = if channel == 1 && halve_green { value / 2 } else { value };
        }
    }

    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::common::error::ConversionError;
    use crate::image_pipeline::raw::{decode, PackingScheme};
    use ndarray::Array2;

    fn ramp_frame(height: usize, width: usize) -> RawFrame {
        let data = Array2::from_shape_fn((height, width), |(r, c)| (r * width + c) as u16 * 10 + 7);
        RawFrame::new(data, 16, PackingScheme::Native16Le)
    }

    #[test]
    fn mosaic_places_rggb_samples() {
        let buffer: Vec<u8> = (0u16..16).flat_map(|v| v.to_le_bytes()).collect();
        let frame = decode(&buffer, 4, 4, PackingScheme::Native16Le).unwrap();
        let rgb = reconstruct(&frame, BayerPattern::RGGB, ReconstructionMode::Mosaic).unwrap();

        assert_eq!(rgb.kind, ImageKind::Sparse);
        assert_eq!(rgb.data[[0, 0, 0]], 0);
        assert_eq!(rgb.data[[0, 1, 1]], 0);
        assert_eq!(rgb.data[[1, 0, 1]], 2);
        assert_eq!(rgb.data[[1, 1, 2]], 5);
        assert_eq!(rgb.data[[2, 2, 0]], 10);
        assert_eq!(rgb.data[[3, 3, 2]], 15);
    }

    #[test]
    fn mosaic_zeroes_foreign_sites() {
        let frame = ramp_frame(5, 6);
        for pattern in BayerPattern::ALL {
            let rgb = reconstruct(&frame, pattern, ReconstructionMode::Mosaic).unwrap();
            for ((row, col), &value) in frame.data.indexed_iter() {
                let own = pattern.site_at(row, col).channel();
                for channel in 0..3 {
                    let expected = match (channel == own, channel) {
                        (false, _) => 0,
                        (true, 1) => value / 2,
                        (true, _) => value,
                    };
                    assert_eq!(rgb.data[[row, col, channel]], expected, "{pattern} ({row},{col}) ch{channel}");
                }
            }
        }
    }

    #[test]
    fn mosaic_floors_odd_green() {
        let frame = RawFrame::new(Array2::from_elem((2, 2), 7), 12, PackingScheme::Packed12In16);
        let rgb = reconstruct(&frame, BayerPattern::GRBG, ReconstructionMode::Mosaic).unwrap();
        assert_eq!(rgb.data[[0, 0, 1]], 3);
        assert_eq!(rgb.data[[0, 1, 0]], 7);
        assert_eq!(rgb.bits_per_sample, 12);
    }

    #[test]
    fn bilinear_preserves_sampled_sites_in_interior() {
        let frame = ramp_frame(8, 10);
        for pattern in BayerPattern::ALL {
            let rgb = reconstruct(&frame, pattern, ReconstructionMode::Bilinear).unwrap();
            assert_eq!(rgb.kind, ImageKind::Dense);
            for row in 1..7 {
                for col in 1..9 {
                    let channel = pattern.site_at(row, col).channel();
                    assert_eq!(rgb.data[[row, col, channel]], frame.data[[row, col]]);
                }
            }
        }
    }

    #[test]
    fn mirror_boundary_preserves_every_sampled_site() {
        let frame = ramp_frame(6, 7);
        let debayer = CpuDebayer::with_boundary(Boundary::Mirror);
        for pattern in BayerPattern::ALL {
            let rgb = debayer.process(&frame, pattern, ReconstructionMode::Bilinear).unwrap();
            for ((row, col), &value) in frame.data.indexed_iter() {
                let channel = pattern.site_at(row, col).channel();
                assert_eq!(rgb.data[[row, col, channel]], value);
            }
        }
    }

    #[test]
    fn nearest_boundary_inflates_border_samples() {
        let data = Array2::from_shape_fn((4, 4), |(r, c)| (100 + 10 * (r * 4 + c)) as u16);
        let frame = RawFrame::new(data, 16, PackingScheme::Native16Le);

        let rgb = reconstruct(&frame, BayerPattern::RGGB, ReconstructionMode::Bilinear).unwrap();
        // replicated edge samples land on the kernel's nonzero taps
        assert_eq!(rgb.data[[0, 0, 0]], 225);
        assert_eq!(rgb.data[[0, 1, 1]], 137);
        assert_eq!(rgb.data[[3, 3, 2]], 562);
        assert_eq!(rgb.data[[1, 1, 2]], 150);
        assert_eq!(rgb.data[[1, 2, 1]], 160);

        let mirrored = CpuDebayer::with_boundary(Boundary::Mirror)
            .process(&frame, BayerPattern::RGGB, ReconstructionMode::Bilinear)
            .unwrap();
        assert_eq!(mirrored.data[[0, 0, 0]], 100);
        assert_eq!(mirrored.data[[0, 1, 1]], 110);
        assert_eq!(mirrored.data[[3, 3, 2]], 250);
    }

    #[test]
    fn bilinear_flat_field_stays_flat() {
        let frame = RawFrame::new(Array2::from_elem((6, 6), 1000), 12, PackingScheme::Packed12In16);
        let debayer = CpuDebayer::with_boundary(Boundary::Mirror);
        let rgb = debayer.process(&frame, BayerPattern::BGGR, ReconstructionMode::Bilinear).unwrap();
        assert!(rgb.data.iter().all(|&v| v == 1000));
    }

    #[test]
    fn bilinear_interpolates_missing_sites() {
        // RGGB: green at (1,1) comes from its four green neighbors
        let frame = ramp_frame(4, 4);
        let rgb = reconstruct(&frame, BayerPattern::RGGB, ReconstructionMode::Bilinear).unwrap();
        let d = &frame.data;
        let green = (d[[0, 1]] as u32 + d[[1, 0]] as u32 + d[[1, 2]] as u32 + d[[2, 1]] as u32) / 4;
        assert_eq!(rgb.data[[1, 1, 1]] as u32, green);
        // red at (1,1) is the mean of the four diagonal reds
        let red = (d[[0, 0]] as u32 + d[[0, 2]] as u32 + d[[2, 0]] as u32 + d[[2, 2]] as u32) / 4;
        assert_eq!(rgb.data[[1, 1, 0]] as u32, red);
        // red at (0,1) is the mean of its horizontal red neighbors
        let red = (d[[0, 0]] as u32 + d[[0, 2]] as u32) / 2;
        let debayer = CpuDebayer::with_boundary(Boundary::Mirror);
        let mirrored = debayer.process(&frame, BayerPattern::RGGB, ReconstructionMode::Bilinear).unwrap();
        assert_eq!(mirrored.data[[0, 1, 0]] as u32, red);
    }

    #[test]
    fn bilinear_saturates_instead_of_wrapping() {
        let frame = RawFrame::new(Array2::from_elem((2, 2), u16::MAX), 16, PackingScheme::Native16Le);
        let rgb = reconstruct(&frame, BayerPattern::RGGB, ReconstructionMode::Bilinear).unwrap();
        assert_eq!(rgb.data[[0, 0, 0]], u16::MAX);
    }

    #[test]
    fn neighbor_fills_gbrg_interior() {
        let frame = ramp_frame(6, 6);
        let d = &frame.data;
        let rgb = reconstruct(&frame, BayerPattern::GBRG, ReconstructionMode::Neighbor).unwrap();
        assert_eq!(rgb.kind, ImageKind::Dense);

        // source sites keep their mosaic values
        assert_eq!(rgb.data[[2, 2, 1]], d[[2, 2]] / 2);
        assert_eq!(rgb.data[[2, 3, 2]], d[[2, 3]]);
        assert_eq!(rgb.data[[3, 2, 0]], d[[3, 2]]);

        // green at a red site (3,2) from above and below
        assert_eq!(rgb.data[[3, 2, 1]], ((d[[2, 2]] as u32 + d[[4, 2]] as u32) / 2) as u16);
        // green at a blue site (2,3) from left and right
        assert_eq!(rgb.data[[2, 3, 1]], ((d[[2, 2]] as u32 + d[[2, 4]] as u32) / 2) as u16);
        // red on a red row between two reds
        assert_eq!(rgb.data[[3, 3, 0]], ((d[[3, 2]] as u32 + d[[3, 4]] as u32) / 2) as u16);
        // red on a blue row from the completed red rows
        assert_eq!(rgb.data[[2, 2, 0]], ((d[[1, 2]] as u32 + d[[3, 2]] as u32) / 2) as u16);
        // blue in a blue column between two blues
        assert_eq!(rgb.data[[3, 3, 2]], ((d[[2, 3]] as u32 + d[[4, 3]] as u32) / 2) as u16);
        // blue in an even column from the completed blue columns
        assert_eq!(rgb.data[[2, 2, 2]], ((d[[2, 1]] as u32 + d[[2, 3]] as u32) / 2) as u16);
    }

    #[test]
    fn neighbor_leaves_edges_without_neighbors_unfilled() {
        let frame = ramp_frame(4, 4);
        let rgb = reconstruct(&frame, BayerPattern::GBRG, ReconstructionMode::Neighbor).unwrap();
        // last row is a red row with no green below
        assert_eq!(rgb.data[[3, 0, 1]], 0);
        // first row has no red row above
        assert_eq!(rgb.data[[0, 0, 0]], 0);
        // first column has no blue column to the left
        assert_eq!(rgb.data[[1, 0, 2]], 0);
    }

    #[test]
    fn neighbor_rejects_other_patterns() {
        let frame = ramp_frame(4, 4);
        for pattern in [BayerPattern::RGGB, BayerPattern::BGGR, BayerPattern::GRBG] {
            let err = reconstruct(&frame, pattern, ReconstructionMode::Neighbor).unwrap_err();
            assert!(matches!(err, ConversionError::UnsupportedPattern { .. }));
        }
    }

    #[test]
    fn reconstruction_leaves_input_untouched() {
        let frame = ramp_frame(4, 6);
        let before = frame.clone();
        let _ = reconstruct(&frame, BayerPattern::GBRG, ReconstructionMode::Neighbor).unwrap();
        let _ = reconstruct(&frame, BayerPattern::GBRG, ReconstructionMode::Bilinear).unwrap();
        assert_eq!(frame, before);
    }
}
