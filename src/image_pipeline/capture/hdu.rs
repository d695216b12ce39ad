//! FITS HDU construction for captured frames.

use chrono::{DateTime, Utc};
use ndarray::s;
use tracing::debug;

use crate::image_pipeline::capture::camera::SensorProperties;
use crate::image_pipeline::capture::clock::{SensorClock, iso_timestamp};
use crate::image_pipeline::capture::host::HostStatus;
use crate::image_pipeline::capture::metadata::CaptureMetadata;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::fits::{FitsHeader, PrimaryHdu};
use crate::image_pipeline::raw::{RawFormat, RawFrame};

pub const INSTRUMENT: &str = "Raspberry Pi HQ Camera Module";
pub const PROGRAM: &str = concat!("astrohq ", env!("CARGO_PKG_VERSION"));

/// Output choices for captured HDUs.
#[derive(Debug, Clone, PartialEq)]
pub struct HduOptions {
    /// Keep only the scaler crop window reported with the frame
    pub crop: bool,
    pub telescope: Option<String>,
    /// Millimetres
    pub focal_length: Option<f64>,
    pub checksum: bool,
    pub program: String,
}

impl Default for HduOptions {
    fn default() -> Self {
        Self {
            crop: true,
            telescope: None,
            focal_length: None,
            checksum: true,
            program: PROGRAM.to_string(),
        }
    }
}

impl HduOptions {
    pub fn crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    pub fn telescope(mut self, telescope: impl Into<String>) -> Self {
        self.telescope = Some(telescope.into());
        self
    }

    pub fn focal_length(mut self, millimetres: f64) -> Self {
        self.focal_length = Some(millimetres);
        self
    }

    pub fn checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }
}

/// Everything that goes into one HDU.
pub struct HduSource<'a> {
    pub frame: &'a RawFrame,
    pub metadata: &'a CaptureMetadata,
    pub format: RawFormat,
    pub properties: &'a SensorProperties,
    pub host: &'a HostStatus,
    pub clock: &'a SensorClock,
    /// Stamped into `DATE`
    pub created: DateTime<Utc>,
}

fn separator(title: &str, left: usize, right: usize) -> String {
    format!("{} {title} {}", "-".repeat(left), "-".repeat(right))
}

/// Crops, flips and annotates a captured frame.
///
/// FITS stores the bottom row first, so rows are reversed; the Bayer pattern
/// card describes the first stored row, after cropping.
pub fn build_hdu(source: &HduSource<'_>, options: &HduOptions) -> Result<PrimaryHdu> {
    let frame = source.frame;
    let meta = source.metadata;
    let bits = source.format.bits;

    let (view, row_offset, col_offset) = match meta.scaler_crop.filter(|_| options.crop) {
        Some(crop) => {
            let (x, y) = (crop.x as usize, crop.y as usize);
            let (width, height) = (crop.width as usize, crop.height as usize);
            if width == 0 || height == 0 || x + width > frame.width() || y + height > frame.height() {
                return Err(ConversionError::InvalidCrop {
                    x,
                    y,
                    width,
                    height,
                    frame_width: frame.width(),
                    frame_height: frame.height(),
                });
            }
            (frame.data.slice(s![y..y + height, x..x + width]), y, x)
        }
        None => (frame.data.view(), 0, 0),
    };

    let data = view.slice(s![..;-1, ..]).to_owned();
    let pattern = source
        .format
        .pattern
        .shifted(row_offset, col_offset)
        .flipped_vertically(data.nrows());

    let black_point = meta.black_point(bits)?;
    debug!(
        min = data.iter().min().copied().unwrap_or(0),
        max = data.iter().max().copied().unwrap_or(0),
        %pattern,
        "Frame prepared"
    );

    let props = source.properties;
    let host = source.host;
    let mut header = FitsHeader::new();
    header.set("BUNIT", "DN", "units of array values")?;
    header.set("INST-SEP", separator("INSTRUMENT/OBSERVATORY INFO", 19, 20), "")?;
    header.set("INSTRUME", INSTRUMENT, "camera name")?;
    header.set("TELESCOP", options.telescope.as_deref(), "telescope model/name")?;
    header.set("FOCALLEN", options.focal_length, "[mm] telescope/lens focal length")?;
    header.set("PROGRAM", options.program.as_str(), "instrument software that generated this HDU")?;
    header.set("PLATFORM", props.platform.as_str(), "platform architecture (VC4/PISP)")?;
    header.set("DET-SEP", separator("DETECTOR CONFIGURATION", 22, 22), "")?;
    header.set("DETECTOR", props.model.to_uppercase(), "camera sensor model")?;
    header.set("XPIXSIZE", props.unit_cell_size.0 as f64 / 1000.0, "[um] pixel width")?;
    header.set("YPIXSIZE", props.unit_cell_size.1 as f64 / 1000.0, "[um] pixel height")?;
    header.set("BAYERPAT", pattern.to_string(), "Bayer filter order/layout")?;
    header.set("BITDEPTH", bits, "number of bits per pixel value")?;
    header.set("DATAMIN", black_point, "[DN] sensor black point")?;
    header.set(
        "DATAMAX",
        source.format.max_value(),
        &format!("[DN] maximum representable value with {bits} bits"),
    )?;
    header.set("GAIN", meta.analogue_gain, "analog gain setting")?;
    header.set("SONY_DPC", host.sensor_dpc, "on-sensor defective pixel correction status")?;
    header.set("RPI_DPC", host.pipeline_dpc, "libcamera defective pixel correction status")?;
    header.set("META-SEP", separator("OBSERVATION METADATA", 23, 23), "")?;
    header.set("FRAMELUX", meta.lux, "[lx] estimated scene brightness/illuminance")?;
    header.set("COLORTMP", meta.colour_temperature, "[K] estimated average color temperature")?;
    header.set("FOCUSFOM", meta.focus_fom, "image focus figure of merit")?;
    header.set("CPU-TEMP", host.cpu_temperature, "[degC] processor/CPU temperature")?;
    header.set("CCD-TEMP", meta.sensor_temperature, "[degC] sensor/detector temperature")?;
    header.set("EXPTIME", meta.exposure_seconds(), "[s] image exposure time")?;
    header.set(
        "DATE-END",
        iso_timestamp(&source.clock.sensor_time_to_utc(meta.sensor_timestamp)),
        "[ISO UTC] time of first pixel readout",
    )?;
    header.set("FILE-SEP", separator("FILE METADATA", 27, 26), "")?;
    header.set("DATE", iso_timestamp(&source.created), "[ISO UTC] time of HDU creation")?;

    let mut hdu = PrimaryHdu::with_header(data, header);
    if options.checksum {
        hdu.add_checksum();
    }
    Ok(hdu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::capture::metadata::ScalerCrop;
    use crate::image_pipeline::fits::HeaderValue;
    use crate::image_pipeline::raw::PackingScheme;
    use chrono::TimeZone;
    use ndarray::Array2;

    struct Fixture {
        frame: RawFrame,
        metadata: CaptureMetadata,
        properties: SensorProperties,
        host: HostStatus,
        clock: SensorClock,
    }

    impl Fixture {
        fn new(crop: Option<[u32; 4]>) -> Self {
            let data = Array2::from_shape_fn((4, 6), |(r, c)| (r * 10 + c) as u16);
            let mut metadata = CaptureMetadata::from_json(
                r#"{"ExposureTime": 500000, "AnalogueGain": 1.5, "SensorBlackLevels": [4096, 4096, 4096, 4096],
                    "SensorTimestamp": 90000000000, "Lux": 0.25, "FocusFoM": 12}"#,
            )
            .unwrap();
            metadata.scaler_crop = crop.map(ScalerCrop::from);
            Self {
                frame: RawFrame::new(data, 12, PackingScheme::Packed12In16),
                metadata,
                properties: SensorProperties::imx477(),
                host: HostStatus {
                    cpu_temperature: Some(51.5),
                    sensor_dpc: Some(false),
                    pipeline_dpc: None,
                },
                clock: SensorClock::from_boot_time(Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap(), true),
            }
        }

        fn build(&self, options: &HduOptions) -> Result<PrimaryHdu> {
            let source = HduSource {
                frame: &self.frame,
                metadata: &self.metadata,
                format: "SRGGB12".parse().unwrap(),
                properties: &self.properties,
                host: &self.host,
                clock: &self.clock,
                created: Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap(),
            };
            build_hdu(&source, options)
        }
    }

    fn card<'a>(hdu: &'a PrimaryHdu, keyword: &str) -> &'a HeaderValue {
        hdu.header().get(keyword).unwrap()
    }

    #[test]
    fn crop_and_flip_rephase_the_pattern() {
        let hdu = Fixture::new(Some([1, 0, 4, 4])).build(&HduOptions::default()).unwrap();
        assert_eq!(hdu.data().dim(), (4, 4));
        // first stored row is the last sensor row, starting at column 1
        assert_eq!(hdu.data()[[0, 0]], 31);
        assert_eq!(hdu.data()[[3, 3]], 4);
        assert_eq!(card(&hdu, "BAYERPAT").as_str(), Some("BGGR"));
    }

    #[test]
    fn uncropped_frame_is_only_flipped() {
        let hdu = Fixture::new(Some([1, 0, 4, 4]))
            .build(&HduOptions::default().crop(false))
            .unwrap();
        assert_eq!(hdu.data().dim(), (4, 6));
        assert_eq!(hdu.data()[[0, 0]], 30);
        assert_eq!(card(&hdu, "BAYERPAT").as_str(), Some("GBRG"));
    }

    #[test]
    fn out_of_bounds_crop_is_rejected() {
        let err = Fixture::new(Some([4, 0, 4, 4])).build(&HduOptions::default()).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidCrop { x: 4, frame_width: 6, .. }));
    }

    #[test]
    fn header_carries_capture_details() {
        let hdu = Fixture::new(None)
            .build(&HduOptions::default().telescope("Celestron C8").focal_length(2032.0))
            .unwrap();

        assert_eq!(card(&hdu, "BUNIT").as_str(), Some("DN"));
        assert_eq!(card(&hdu, "TELESCOP").as_str(), Some("Celestron C8"));
        assert_eq!(card(&hdu, "FOCALLEN").as_f64(), Some(2032.0));
        assert_eq!(card(&hdu, "DETECTOR").as_str(), Some("IMX477"));
        assert_eq!(card(&hdu, "XPIXSIZE").as_f64(), Some(1.55));
        assert_eq!(card(&hdu, "BITDEPTH").as_i64(), Some(12));
        assert_eq!(card(&hdu, "DATAMIN").as_i64(), Some(256));
        assert_eq!(card(&hdu, "DATAMAX").as_i64(), Some(4095));
        assert_eq!(card(&hdu, "GAIN").as_f64(), Some(1.5));
        assert_eq!(card(&hdu, "SONY_DPC").as_bool(), Some(false));
        assert_eq!(card(&hdu, "RPI_DPC"), &HeaderValue::Undefined);
        assert_eq!(card(&hdu, "COLORTMP"), &HeaderValue::Undefined);
        assert_eq!(card(&hdu, "FOCUSFOM").as_i64(), Some(12));
        assert_eq!(card(&hdu, "CPU-TEMP").as_f64(), Some(51.5));
        assert_eq!(card(&hdu, "EXPTIME").as_f64(), Some(0.5));
        assert_eq!(card(&hdu, "DATE-END").as_str(), Some("2024-03-01T20:01:30.000000"));
        assert_eq!(card(&hdu, "DATE").as_str(), Some("2024-03-01T21:00:00.000000"));
        assert!(hdu.has_checksum());
    }

    #[test]
    fn separators_fill_whole_cards() {
        let hdu = Fixture::new(None).build(&HduOptions::default()).unwrap();
        for keyword in ["INST-SEP", "DET-SEP", "META-SEP", "FILE-SEP"] {
            assert_eq!(card(&hdu, keyword).as_str().map(str::len), Some(68), "{keyword}");
        }
        let keywords: Vec<&str> = hdu.header().cards().iter().map(|c| c.keyword.as_str()).collect();
        assert_eq!(keywords.first(), Some(&"BUNIT"));
        assert_eq!(keywords.last(), Some(&"DATE"));
    }
}
