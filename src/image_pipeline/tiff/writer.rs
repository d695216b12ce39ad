use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::types::ReconstructedImage;
use crate::image_pipeline::raw::types::RawFrame;
use crate::image_pipeline::tiff::types::ConversionConfig;

pub trait TiffWriter {
    fn write_tiff(&self, frame: &RawFrame, output: &mut dyn Write, config: &ConversionConfig) -> Result<()>;
    fn write_rgb_tiff(
        &self,
        image: &ReconstructedImage,
        output: &mut dyn Write,
        config: &ConversionConfig,
    ) -> Result<()>;
}
