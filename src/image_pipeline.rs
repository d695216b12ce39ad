//! Image processing pipeline module
//!
//! Raw sensor buffers are decoded into frames, optionally reconstructed to
//! RGB, and written out as TIFF or FITS. The capture module drives the camera
//! and annotates frames for FITS output.

pub mod capture;
pub mod common;
pub mod conversions;
pub mod debayer;
pub mod fits;
pub mod raw;
pub mod stats;
pub mod tiff;

pub use common::{
    ConversionError,
    Result,
};

pub use raw::{
    decode,
    PackedBufferReader,
    PackingScheme,
    RawFormat,
    RawFrame,
    RawImageReader,
};

pub use debayer::{
    masks_for,
    reconstruct,
    BayerPattern,
    Boundary,
    ChannelMask,
    CpuDebayer,
    ReconstructedImage,
    ReconstructionMode,
};

pub use self::tiff::{
    TiffCompression,
    ConversionConfig,
    ConversionConfigBuilder,
    TiffWriter,
    StandardTiffWriter,
};

pub use fits::{FitsHeader, HeaderValue, PrimaryHdu};

pub use capture::{
    CameraControls,
    CaptureBackend,
    CaptureMetadata,
    HduOptions,
    PiHqCamera,
    ReplayBackend,
    SensorClock,
};

pub use stats::FrameStats;

pub use conversions::{
    RawToTiffPipeline,
};
