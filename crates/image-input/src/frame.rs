//! Decoded image frames

use std::path::Path;

use image::imageops::FilterType;
use tracing::debug;

use crate::ImageError;

/// Decoded RGB still image
#[derive(Debug, Clone)]
pub struct ImageFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
}

impl ImageFrame {
    /// Create a frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(ImageError::Decode(format!(
                "expected {} bytes of RGB data for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { data, width, height })
    }

    /// Decode an encoded image blob (JPEG, PNG, ...)
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        debug!(width, height, "decoded image");
        Self::new(rgb.into_raw(), width, height)
    }

    /// Read and decode an image file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayFrame {
        let mut gray = Vec::with_capacity(self.width as usize * self.height as usize);
        for pixel in self.data.chunks_exact(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114;
            gray.push(y.round().min(255.0) as u8);
        }
        GrayFrame {
            data: gray,
            width: self.width,
            height: self.height,
        }
    }
}

/// Single-channel 8-bit image
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    /// Intensity data (width * height)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl GrayFrame {
    /// Create a gray frame from raw intensities
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        if data.len() != width as usize * height as usize {
            return Err(ImageError::Decode(format!(
                "expected {} bytes of gray data for {}x{}, got {}",
                width as usize * height as usize,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { data, width, height })
    }

    /// Upscale by `factor` with bilinear interpolation
    pub fn upsample(&self, factor: u32) -> GrayFrame {
        if factor <= 1 {
            return self.clone();
        }
        let Some(buffer) =
            image::GrayImage::from_raw(self.width, self.height, self.data.clone())
        else {
            // dimensions are validated on construction
            return self.clone();
        };
        let resized = image::imageops::resize(
            &buffer,
            self.width * factor,
            self.height * factor,
            FilterType::Triangle,
        );
        let (width, height) = resized.dimensions();
        GrayFrame {
            data: resized.into_raw(),
            width,
            height,
        }
    }

    /// Mean intensity as a percentage of full scale
    pub fn contrast_percent(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&v| v as u64).sum();
        100.0 * (sum as f64 / self.data.len() as f64) / 255.0
    }
}
