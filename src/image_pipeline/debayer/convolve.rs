use ndarray::{Array2, ArrayView2};

use crate::image_pipeline::debayer::types::Boundary;

pub(crate) type Kernel3 = [[f64; 3]; 3];

pub(crate) const GREEN_KERNEL: Kernel3 = [
    [0.0, 0.25, 0.0],
    [0.25, 1.0, 0.25],
    [0.0, 0.25, 0.0],
];

pub(crate) const RED_BLUE_KERNEL: Kernel3 = [
    [0.25, 0.5, 0.25],
    [0.5, 1.0, 0.5],
    [0.25, 0.5, 0.25],
];

/// Maps a possibly out-of-range coordinate back into `0..len`.
#[inline]
fn resolve(position: isize, len: usize, boundary: Boundary) -> usize {
    let last = len as isize - 1;
    match boundary {
        Boundary::Nearest => position.clamp(0, last) as usize,
        Boundary::Mirror => {
            if len == 1 {
                0
            } else if position < 0 {
                (-position).min(last) as usize
            } else if position > last {
                (2 * last - position).max(0) as usize
            } else {
                position as usize
            }
        }
    }
}

/// 3x3 correlation of `plane` with `kernel`. The kernels used here are
/// symmetric, so this equals convolution.
pub(crate) fn convolve3x3(plane: ArrayView2<'_, u16>, kernel: &Kernel3, boundary: Boundary) -> Array2<f64> {
    let (height, width) = plane.dim();

    Array2::from_shape_fn((height, width), |(row, col)| {
        let mut sum = 0.0;
        for (ky, kernel_row) in kernel.iter().enumerate() {
            let y = resolve(row as isize + ky as isize - 1, height, boundary);
            for (kx, &weight) in kernel_row.iter().enumerate() {
                if weight == 0.0 {
                    continue;
                }
                let x = resolve(col as isize + kx as isize - 1, width, boundary);
                sum += weight * plane[[y, x]] as f64;
            }
        }
        sum
    })
}
