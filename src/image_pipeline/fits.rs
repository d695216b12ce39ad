//! FITS output
//!
//! Primary HDUs of unsigned 16-bit images written through cfitsio, with the
//! header cards collected in memory first and optional `CHECKSUM`/`DATASUM`
//! integrity cards.

pub mod header;
mod reader;
mod writer;

pub use header::{FitsHeader, HeaderCard, HeaderValue};
pub use reader::read_image;
pub use writer::PrimaryHdu;
