//! Image Input
//!
//! Turns an uploaded still image into the frames the analysis pipeline reads:
//! - Decoding from an in-memory blob or a file path (any format `image` reads)
//! - Grayscale conversion for the detector and landmark predictor
//! - 2x upsampling of the gray plane for small-face detection

pub mod frame;

pub use frame::{GrayFrame, ImageFrame};

use thiserror::Error;

/// Image input error types
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image has no pixels")]
    Empty,
}
