//! Capture front end for the Raspberry Pi HQ camera
//!
//! A [`PiHqCamera`] wraps a [`CaptureBackend`], decodes raw requests and
//! turns them into annotated FITS HDUs. [`ReplayBackend`] stands in for the
//! driver when working from recorded frames.

pub mod bracket;
mod camera;
pub mod clock;
mod hdu;
pub mod host;
mod metadata;
mod replay;

pub use bracket::{bracket_file_name, exposure_bracket, sequence_path};
pub use camera::{CameraControls, CaptureBackend, PiHqCamera, RawCapture, SensorProperties};
pub use clock::SensorClock;
pub use hdu::{HduOptions, HduSource, build_hdu};
pub use host::{HostPaths, HostStatus};
pub use metadata::{CaptureMetadata, ScalerCrop};
pub use replay::ReplayBackend;
