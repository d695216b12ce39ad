//! Camera adapter for the Raspberry Pi HQ camera.
//!
//! The driver sits behind [`CaptureBackend`]; [`PiHqCamera`] holds one and
//! exposes only the configuration and capture steps the astronomy tools use.

use std::path::Path;

use chrono::Utc;
use tracing::{info, instrument};

use crate::image_pipeline::capture::clock::{SensorClock, iso_timestamp};
use crate::image_pipeline::capture::hdu::{HduOptions, HduSource, build_hdu};
use crate::image_pipeline::capture::host::HostStatus;
use crate::image_pipeline::capture::metadata::CaptureMetadata;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::fits::PrimaryHdu;
use crate::image_pipeline::raw::{RawFormat, RawFrame, decode};

/// Static description of the sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorProperties {
    pub model: String,
    /// Pixel pitch in nanometres, `(x, y)`
    pub unit_cell_size: (u32, u32),
    /// ISP platform, `VC4` or `PISP`
    pub platform: String,
}

impl SensorProperties {
    pub fn imx477() -> Self {
        Self {
            model: "imx477".to_string(),
            unit_cell_size: (1550, 1550),
            platform: "VC4".to_string(),
        }
    }
}

/// Sensor controls, read from and written back to the backend explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraControls {
    /// Microseconds; `None` until set
    pub exposure_time: Option<u64>,
    pub analogue_gain: f64,
    /// Red and blue gains
    pub colour_gains: (f64, f64),
    pub awb_enable: bool,
    pub ae_enable: bool,
    pub sharpness: f64,
    pub noise_reduction: bool,
}

impl CameraControls {
    /// Unity colour gains with every automatic or cosmetic stage off.
    pub fn scientific(analogue_gain: f64) -> Self {
        Self {
            exposure_time: None,
            analogue_gain,
            colour_gains: (1.0, 1.0),
            awb_enable: false,
            ae_enable: false,
            sharpness: 0.0,
            noise_reduction: false,
        }
    }

    /// Exposure in seconds.
    pub fn exposure(&self) -> Option<f64> {
        self.exposure_time.map(|us| us as f64 / 1e6)
    }

    /// Sets the exposure in seconds, rounded to whole microseconds.
    pub fn set_exposure(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ConversionError::InvalidParameter(format!(
                "exposure must be a non-negative number of seconds, got {seconds}"
            )));
        }
        self.exposure_time = Some((seconds * 1e6).round() as u64);
        Ok(())
    }
}

impl Default for CameraControls {
    fn default() -> Self {
        Self::scientific(1.0)
    }
}

/// One raw request: the sample buffer, its geometry and the metadata.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub buffer: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub metadata: CaptureMetadata,
}

/// Driver operations needed by the adapter.
pub trait CaptureBackend {
    fn properties(&self) -> &SensorProperties;

    /// Raw stream format as configured
    fn raw_format(&self) -> RawFormat;

    fn controls(&self) -> Result<CameraControls>;

    fn apply_controls(&mut self, controls: &CameraControls) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;

    /// Blocks until the next raw request completes.
    fn capture_raw(&mut self) -> Result<RawCapture>;

    fn host_status(&self) -> HostStatus;
}

pub struct PiHqCamera<B: CaptureBackend> {
    backend: B,
    clock: SensorClock,
    options: HduOptions,
}

impl<B: CaptureBackend> PiHqCamera<B> {
    /// Wraps `backend` and applies scientific controls at `gain`.
    pub fn new(mut backend: B, clock: SensorClock, gain: f64) -> Result<Self> {
        let controls = CameraControls {
            exposure_time: backend.controls()?.exposure_time,
            ..CameraControls::scientific(gain)
        };
        backend.apply_controls(&controls)?;
        info!(format = %backend.raw_format(), gain, "Camera configured");

        Ok(Self {
            backend,
            clock,
            options: HduOptions::default(),
        })
    }

    pub fn with_options(mut self, options: HduOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &HduOptions {
        &self.options
    }

    pub fn clock(&self) -> &SensorClock {
        &self.clock
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn raw_format(&self) -> RawFormat {
        self.backend.raw_format()
    }

    pub fn controls(&self) -> Result<CameraControls> {
        self.backend.controls()
    }

    pub fn set_controls(&mut self, controls: &CameraControls) -> Result<()> {
        self.backend.apply_controls(controls)
    }

    /// Current exposure in seconds, `None` if the backend has none set.
    pub fn exposure(&self) -> Result<Option<f64>> {
        Ok(self.backend.controls()?.exposure())
    }

    pub fn set_exposure(&mut self, seconds: f64) -> Result<()> {
        let mut controls = self.backend.controls()?;
        controls.set_exposure(seconds)?;
        self.backend.apply_controls(&controls)
    }

    pub fn start(&mut self) -> Result<()> {
        self.backend.start()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.backend.stop()
    }

    /// Captures and decodes one raw frame.
    pub fn capture_frame(&mut self) -> Result<(RawFrame, CaptureMetadata)> {
        let format = self.backend.raw_format();
        let scheme = format.scheme()?;

        info!("Capture starting at {}", iso_timestamp(&Utc::now()));
        let capture = self.backend.capture_raw()?;
        info!("Request released at {}", iso_timestamp(&Utc::now()));

        let frame = decode(&capture.buffer, capture.width, capture.height, scheme)?
            .with_bits_per_sample(format.bits);
        Ok((frame, capture.metadata))
    }

    #[instrument(skip(self))]
    pub fn capture_hdu(&mut self) -> Result<PrimaryHdu> {
        let (frame, metadata) = self.capture_frame()?;
        let host = self.backend.host_status();
        let source = HduSource {
            frame: &frame,
            metadata: &metadata,
            format: self.backend.raw_format(),
            properties: self.backend.properties(),
            host: &host,
            clock: &self.clock,
            created: Utc::now(),
        };
        build_hdu(&source, &self.options)
    }

    /// Captures one frame into `path`, replacing any existing file.
    pub fn capture_fits<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let hdu = self.capture_hdu()?;
        hdu.write_file(path, true)
    }

    pub fn start_and_capture_fits<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.start()?;
        self.capture_fits(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::capture::replay::ReplayBackend;
    use crate::image_pipeline::fits::read_image;
    use crate::image_pipeline::fits::testing::{checksum_status, read_key};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn metadata() -> CaptureMetadata {
        CaptureMetadata::from_json(
            r#"{"ExposureTime": 2000000, "AnalogueGain": 2.0, "SensorBlackLevels": [4096, 4096, 4096, 4096],
                "ScalerCrop": [2, 0, 4, 4], "SensorTimestamp": 5000000000, "SensorTemperature": 38.0}"#,
        )
        .unwrap()
    }

    fn camera() -> PiHqCamera<ReplayBackend> {
        // 6x4 frame of 12-bit samples
        let buffer: Vec<u8> = (0..24u16).flat_map(|v| (v * 100).to_le_bytes()).collect();
        let backend = ReplayBackend::new(buffer, 6, 4, metadata(), "SRGGB12".parse().unwrap());
        let clock = SensorClock::from_boot_time(Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(), true);
        PiHqCamera::new(backend, clock, 2.0).unwrap()
    }

    #[test]
    fn new_applies_scientific_controls() {
        let cam = camera();
        let controls = cam.controls().unwrap();
        assert_eq!(controls.analogue_gain, 2.0);
        assert!(!controls.awb_enable && !controls.ae_enable);
        assert_eq!(controls.colour_gains, (1.0, 1.0));
    }

    #[test]
    fn exposure_round_trips_through_backend() {
        let mut cam = camera();
        assert_eq!(cam.exposure().unwrap(), None);
        cam.set_exposure(2.5).unwrap();
        assert_eq!(cam.exposure().unwrap(), Some(2.5));
        assert_eq!(cam.controls().unwrap().exposure_time, Some(2_500_000));
        assert!(cam.set_exposure(-1.0).is_err());
    }

    #[test]
    fn capture_frame_decodes_with_format_depth() {
        let mut cam = camera();
        cam.start().unwrap();
        let (frame, meta) = cam.capture_frame().unwrap();
        assert_eq!(frame.bits_per_sample, 12);
        assert_eq!((frame.height(), frame.width()), (4, 6));
        assert_eq!(frame.data[[1, 0]], 600);
        assert_eq!(meta.exposure_time, 2_000_000);
    }

    #[test]
    fn capture_requires_a_running_backend() {
        let mut cam = camera();
        assert!(matches!(cam.capture_frame(), Err(ConversionError::CaptureError(_))));
    }

    #[test]
    fn start_and_capture_writes_fits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.fits");
        let mut cam = camera();
        cam.start_and_capture_fits(&path).unwrap();

        // cropped to the 4x4 scaler window starting at column 2
        assert_eq!(read_image(&path).unwrap().dim(), (4, 4));
        assert_eq!(read_key::<f64>(&path, "EXPTIME"), 2.0);
        assert_eq!(read_key::<String>(&path, "DATE-END"), "2024-03-01T20:00:05.000000");
        assert_eq!(checksum_status(&path), (1, 1));
    }
}
