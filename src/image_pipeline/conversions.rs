//! Pipeline conversions module
//!
//! This module contains orchestration logic for raw dump to TIFF conversion.

mod raw_to_tiff;


pub use raw_to_tiff::RawToTiffPipeline;
