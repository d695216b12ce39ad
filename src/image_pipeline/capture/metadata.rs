//! Per-frame metadata as reported by libcamera.

use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Rectangle of the full pixel array that was read out, `[x, y, w, h]` on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct ScalerCrop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<[u32; 4]> for ScalerCrop {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<ScalerCrop> for [u32; 4] {
    fn from(crop: ScalerCrop) -> Self {
        [crop.x, crop.y, crop.width, crop.height]
    }
}

/// Controls and sensor readings attached to one captured request.
///
/// Keys follow libcamera naming; anything not listed here (colour
/// correction matrix, digital gain, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CaptureMetadata {
    /// Exposure time in microseconds
    pub exposure_time: u64,
    pub analogue_gain: f64,
    /// Per-channel black levels scaled to 16 bits
    #[serde(default)]
    pub sensor_black_levels: Vec<u32>,
    pub scaler_crop: Option<ScalerCrop>,
    /// Nanoseconds since boot at first pixel readout
    pub sensor_timestamp: u64,
    /// Degrees Celsius
    pub sensor_temperature: Option<f64>,
    pub lux: Option<f64>,
    /// Kelvin
    pub colour_temperature: Option<u32>,
    #[serde(rename = "FocusFoM")]
    pub focus_fom: Option<u32>,
}

impl CaptureMetadata {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn exposure_seconds(&self) -> f64 {
        self.exposure_time as f64 / 1e6
    }

    /// Black point in units of a `bits`-deep sample.
    ///
    /// All channels must report the same level.
    pub fn black_point(&self, bits: u32) -> Result<u32> {
        let (first, rest) = self
            .sensor_black_levels
            .split_first()
            .ok_or_else(|| ConversionError::InconsistentMetadata("no sensor black levels reported".to_string()))?;

        if rest.iter().any(|level| level != first) {
            return Err(ConversionError::InconsistentMetadata(format!(
                "sensor black levels differ between channels: {:?}",
                self.sensor_black_levels
            )));
        }

        Ok(first >> 16u32.saturating_sub(bits))
    }
}
