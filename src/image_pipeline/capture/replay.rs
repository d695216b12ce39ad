//! Offline backend replaying a recorded raw buffer and its metadata.
//!
//! Every capture returns the same samples. Metadata follows the applied
//! controls: exposure and gain are taken from them and the sensor timestamp
//! advances by one exposure per frame.

use std::path::Path;

use tracing::debug;

use crate::image_pipeline::capture::camera::{CameraControls, CaptureBackend, RawCapture, SensorProperties};
use crate::image_pipeline::capture::host::HostStatus;
use crate::image_pipeline::capture::metadata::CaptureMetadata;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::RawFormat;

#[derive(Debug, Clone)]
pub struct ReplayBackend {
    buffer: Vec<u8>,
    width: usize,
    height: usize,
    metadata: CaptureMetadata,
    format: RawFormat,
    properties: SensorProperties,
    host: HostStatus,
    controls: CameraControls,
    running: bool,
    frames: u64,
}

impl ReplayBackend {
    pub fn new(buffer: Vec<u8>, width: usize, height: usize, metadata: CaptureMetadata, format: RawFormat) -> Self {
        let controls = CameraControls::scientific(metadata.analogue_gain);
        Self {
            buffer,
            width,
            height,
            metadata,
            format,
            properties: SensorProperties::imx477(),
            host: HostStatus::default(),
            controls,
            running: false,
            frames: 0,
        }
    }

    /// Loads a raw dump and the JSON metadata recorded with it.
    pub fn from_files(
        raw_path: &Path,
        metadata_path: &Path,
        width: usize,
        height: usize,
        format: RawFormat,
    ) -> Result<Self> {
        let buffer = std::fs::read(raw_path)
            .map_err(|e| ConversionError::InputReadError(format!("{}: {}", raw_path.display(), e)))?;
        let json = std::fs::read_to_string(metadata_path)
            .map_err(|e| ConversionError::InputReadError(format!("{}: {}", metadata_path.display(), e)))?;
        Ok(Self::new(buffer, width, height, CaptureMetadata::from_json(&json)?, format))
    }

    pub fn with_host_status(mut self, host: HostStatus) -> Self {
        self.host = host;
        self
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames
    }
}

impl CaptureBackend for ReplayBackend {
    fn properties(&self) -> &SensorProperties {
        &self.properties
    }

    fn raw_format(&self) -> RawFormat {
        self.format
    }

    fn controls(&self) -> Result<CameraControls> {
        Ok(self.controls.clone())
    }

    fn apply_controls(&mut self, controls: &CameraControls) -> Result<()> {
        debug!(?controls, "Applying controls");
        self.controls = controls.clone();
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn capture_raw(&mut self) -> Result<RawCapture> {
        if !self.running {
            return Err(ConversionError::CaptureError("camera is not started".to_string()));
        }

        let mut metadata = self.metadata.clone();
        if let Some(exposure_time) = self.controls.exposure_time {
            metadata.exposure_time = exposure_time;
        }
        metadata.analogue_gain = self.controls.analogue_gain;
        metadata.sensor_timestamp += self.frames * metadata.exposure_time * 1_000;
        self.frames += 1;

        Ok(RawCapture {
            buffer: self.buffer.clone(),
            width: self.width,
            height: self.height,
            metadata,
        })
    }

    fn host_status(&self) -> HostStatus {
        self.host
    }
}
