use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;

use fitsio::FitsFile;
use fitsio::errors::check_status;
use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::sys;
use ndarray::Array2;
use tracing::{debug, info, instrument};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::fits::header::{FitsHeader, HeaderCard, HeaderValue};

/// Keywords owned by cfitsio for an unsigned 16-bit image; user cards with
/// these names are skipped when writing.
const STRUCTURAL: [&str; 10] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "BZERO", "BSCALE", "CHECKSUM", "DATASUM",
];

/// A primary HDU holding an unsigned 16-bit image.
///
/// Row 0 of `data` is the first row in the file, which FITS viewers display
/// at the bottom.
#[derive(Debug, Clone)]
pub struct PrimaryHdu {
    data: Array2<u16>,
    header: FitsHeader,
    checksum: bool,
}

impl PrimaryHdu {
    pub fn new(data: Array2<u16>) -> Self {
        Self::with_header(data, FitsHeader::new())
    }

    pub fn with_header(data: Array2<u16>, header: FitsHeader) -> Self {
        Self {
            data,
            header,
            checksum: false,
        }
    }

    pub fn data(&self) -> &Array2<u16> {
        &self.data
    }

    pub fn header(&self) -> &FitsHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut FitsHeader {
        &mut self.header
    }

    /// Have cfitsio add `CHECKSUM` and `DATASUM` cards on write.
    pub fn add_checksum(&mut self) {
        self.checksum = true;
    }

    pub fn has_checksum(&self) -> bool {
        self.checksum
    }

    /// Writes the HDU to `path`; an existing file is only replaced when
    /// `overwrite` is set.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn write_file<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if !overwrite && path.exists() {
            return Err(ConversionError::OutputWriteError(format!(
                "{} already exists",
                path.display()
            )));
        }

        let (height, width) = self.data.dim();
        let dimensions = [height, width];
        let description = ImageDescription {
            data_type: ImageType::UnsignedShort,
            dimensions: &dimensions,
        };

        let mut builder = FitsFile::create(path).with_custom_primary(&description);
        if overwrite {
            builder = builder.overwrite();
        }
        let mut fptr = builder
            .open()
            .map_err(|e| ConversionError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
        let hdu = fptr.primary_hdu()?;

        for card in self.header.cards() {
            if STRUCTURAL.contains(&card.keyword.as_str()) {
                debug!(keyword = %card.keyword, "Skipping structural card");
                continue;
            }
            write_card(&mut fptr, &hdu, card)?;
        }

        let samples: Vec<u16> = self.data.iter().copied().collect();
        hdu.write_image(&mut fptr, &samples)?;

        if self.checksum {
            let mut status = 0;
            // SAFETY: `fptr` is open and positioned on the primary HDU
            unsafe {
                sys::ffpcks(fptr.as_raw(), &mut status);
            }
            check_status(status)?;
        }

        info!(width, height, cards = self.header.len(), "FITS file written");
        Ok(())
    }
}

fn c_string(text: &str) -> Result<CString> {
    CString::new(text).map_err(|e| ConversionError::InvalidParameter(e.to_string()))
}

fn write_card(fptr: &mut FitsFile, hdu: &FitsHdu, card: &HeaderCard) -> Result<()> {
    let keyword = card.keyword.as_str();
    let comment = card.comment.as_str();
    match &card.value {
        HeaderValue::Str(s) => hdu.write_key(fptr, keyword, (s.as_str(), comment))?,
        HeaderValue::Int(i) => hdu.write_key(fptr, keyword, (*i, comment))?,
        HeaderValue::Float(f) => hdu.write_key(fptr, keyword, (*f, comment))?,
        // fitsio has no logical or null writers
        HeaderValue::Logical(flag) => {
            let (name, remark) = (c_string(keyword)?, c_string(comment)?);
            let mut status = 0;
            // SAFETY: the strings outlive the call and `fptr` is open
            unsafe {
                sys::ffpkyl(fptr.as_raw(), name.as_ptr(), *flag as c_int, remark.as_ptr(), &mut status);
            }
            check_status(status)?;
        }
        HeaderValue::Undefined => {
            let (name, remark) = (c_string(keyword)?, c_string(comment)?);
            let mut status = 0;
            // SAFETY: as above
            unsafe {
                sys::ffpkyu(fptr.as_raw(), name.as_ptr(), remark.as_ptr(), &mut status);
            }
            check_status(status)?;
        }
    }
    Ok(())
}
