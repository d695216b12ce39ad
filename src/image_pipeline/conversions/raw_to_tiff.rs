use tracing::{info, instrument};
use std::io::Write;
use std::path::Path;

use crate::image_pipeline::{
    common::error::{ConversionError, Result},
    debayer::CpuDebayer,
    raw::RawImageReader,
    tiff::{TiffWriter, StandardTiffWriter, ConversionConfig},
};

pub struct RawToTiffPipeline<R: RawImageReader, W: TiffWriter> {
    reader: R,
    writer: W,
    config: ConversionConfig,
}

impl<R: RawImageReader> RawToTiffPipeline<R, StandardTiffWriter> {
    pub fn new(reader: R, config: ConversionConfig) -> Self {
        Self {
            reader,
            writer: StandardTiffWriter,
            config,
        }
    }
}

impl<R: RawImageReader, W: TiffWriter> RawToTiffPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: ConversionConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn convert(&self, input_data: &[u8], output: &mut dyn Write) -> Result<()> {
        info!("Starting RAW to TIFF conversion");

        let frame = {
            let _span = tracing::info_span!("decode_raw").entered();
            self.reader.read_raw(input_data)?
        };

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = frame.width(),
                height = frame.height()
            ).entered();
            self.validate_dimensions(frame.width(), frame.height())?;
        }

        if self.config.debayer {
            let image = {
                let _span = tracing::info_span!("reconstruct",
                    pattern = %self.config.pattern,
                    mode = %self.config.mode
                ).entered();
                CpuDebayer::with_boundary(self.config.boundary)
                    .process(&frame, self.config.pattern, self.config.mode)?
            };

            let _span = tracing::info_span!("encode_tiff", channels = 3).entered();
            self.writer.write_rgb_tiff(&image, output, &self.config)?;
        } else {
            let _span = tracing::info_span!("encode_tiff", channels = 1).entered();
            self.writer.write_tiff(&frame, output, &self.config)?;
        }

        info!(
            width = frame.width(),
            height = frame.height(),
            debayered = self.config.debayer,
            "Conversion complete"
        );
        Ok(())
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<()> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                ConversionError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        let mut output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                ConversionError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };

        self.convert(&input_data, &mut output_file)?;

        Ok(())
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }
}
