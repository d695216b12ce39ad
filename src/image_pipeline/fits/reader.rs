use std::path::Path;

use fitsio::FitsFile;
use fitsio::hdu::HduInfo;
use ndarray::Array2;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Reads the primary image of a FITS file as unsigned 16-bit samples.
///
/// Rows come back in file order, so row 0 is the bottom row of the image as
/// FITS viewers show it. cfitsio applies `BZERO`/`BSCALE`; values outside the
/// u16 range are an error.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Array2<u16>> {
    let path = path.as_ref();
    let file_len = std::fs::metadata(path)
        .map_err(|e| ConversionError::InputReadError(format!("{}: {}", path.display(), e)))?
        .len();

    let mut fptr = FitsFile::open(path)
        .map_err(|e| ConversionError::InputReadError(format!("{}: {}", path.display(), e)))?;
    let hdu = fptr.primary_hdu()?;

    let (height, width) = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[0], shape[1]),
        HduInfo::ImageInfo { shape, .. } => {
            return Err(ConversionError::InputReadError(format!(
                "{}: expected a 2-D image, found {} axes",
                path.display(),
                shape.len()
            )));
        }
        _ => {
            return Err(ConversionError::InputReadError(format!(
                "{}: primary HDU holds no image",
                path.display()
            )));
        }
    };
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions(width, height));
    }

    // axis lengths are untrusted; every sample takes at least one byte
    let samples = width.checked_mul(height);
    let actual = usize::try_from(file_len).unwrap_or(usize::MAX);
    match samples {
        Some(n) if n <= actual => {}
        _ => {
            return Err(ConversionError::MalformedBuffer {
                expected: samples.unwrap_or(usize::MAX),
                actual,
            });
        }
    }

    let data: Vec<u16> = hdu.read_image(&mut fptr)?;
    debug!(width, height, "FITS image read");
    Array2::from_shape_vec((height, width), data)
        .map_err(|e| ConversionError::InputReadError(e.to_string()))
}
