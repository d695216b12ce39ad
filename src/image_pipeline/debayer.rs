//! Debayering module for reconstructing RGB images from Bayer mosaics

mod convolve;
pub mod cpu_debayer;
pub mod masks;
mod neighbor;
pub mod types;

pub use cpu_debayer::{reconstruct, CpuDebayer};
pub use masks::masks_for;
pub use types::{
    BayerPattern, Boundary, CfaSite, ChannelMask, ImageKind, ReconstructedImage, ReconstructionMode,
};
