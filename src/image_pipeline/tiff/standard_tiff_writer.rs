use std::io::{Cursor, Seek, Write};

use tiff::encoder::colortype::{Gray16, RGB16};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::debayer::types::ReconstructedImage;
use crate::image_pipeline::raw::types::RawFrame;
use crate::image_pipeline::tiff::types::{ConversionConfig, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl StandardTiffWriter {
    fn configured_encoder<W: Write + Seek>(writer: W, config: &ConversionConfig) -> Result<TiffEncoder<W>> {
        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(writer)
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        Ok(encoder)
    }
}

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, frame: &RawFrame, output: &mut dyn Write, config: &ConversionConfig) -> Result<()> {
        debug!("Encoding grayscale TIFF: {}x{}", frame.width(), frame.height());

        let samples: Vec<u16> = frame.data.iter().copied().collect();
        let mut buffer = Vec::new();
        Self::configured_encoder(Cursor::new(&mut buffer), config)?
            .write_image::<Gray16>(frame.width() as u32, frame.height() as u32, &samples)
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?;
        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }

    fn write_rgb_tiff(
        &self,
        image: &ReconstructedImage,
        output: &mut dyn Write,
        config: &ConversionConfig,
    ) -> Result<()> {
        debug!("Encoding RGB TIFF: {}x{}", image.width(), image.height());

        let samples = image.interleaved();
        let mut buffer = Vec::new();
        Self::configured_encoder(Cursor::new(&mut buffer), config)?
            .write_image::<RGB16>(image.width() as u32, image.height() as u32, &samples)
            .map_err(|e| ConversionError::EncodeError(e.to_string()))?;
        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::debayer::{reconstruct, BayerPattern, ReconstructionMode};
    use crate::image_pipeline::raw::PackingScheme;
    use ndarray::Array2;
    use tiff::decoder::{Decoder, DecodingResult};
    use tiff::ColorType as DecodedColor;

    fn frame() -> RawFrame {
        let data = Array2::from_shape_fn((6, 8), |(r, c)| (r * 8 + c) as u16 * 50);
        RawFrame::new(data, 12, PackingScheme::Packed12In16)
    }

    #[test]
    fn grayscale_tiff_round_trips() {
        let frame = frame();
        let mut output = Vec::new();
        StandardTiffWriter
            .write_tiff(&frame, &mut output, &ConversionConfig::default())
            .unwrap();

        let mut decoder = Decoder::new(Cursor::new(output)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (8, 6));
        assert_eq!(decoder.colortype().unwrap(), DecodedColor::Gray(16));
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => assert_eq!(data, frame.data.iter().copied().collect::<Vec<_>>()),
            _ => panic!("expected 16-bit samples"),
        }
    }

    #[test]
    fn rgb_tiff_is_interleaved() {
        let image = reconstruct(&frame(), BayerPattern::RGGB, ReconstructionMode::Mosaic).unwrap();
        let config = ConversionConfig::builder()
            .compression(TiffCompression::DeflateFast)
            .build();
        let mut output = Vec::new();
        StandardTiffWriter.write_rgb_tiff(&image, &mut output, &config).unwrap();

        let mut decoder = Decoder::new(Cursor::new(output)).unwrap();
        assert_eq!(decoder.colortype().unwrap(), DecodedColor::RGB(16));
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => {
                assert_eq!(data.len(), 6 * 8 * 3);
                assert_eq!(data, image.interleaved());
            }
            _ => panic!("expected 16-bit samples"),
        }
    }
}
