//! SeetaFace frontal face detector

use std::io::Cursor;
use std::path::Path;

use face_analysis::{AnalysisError, BoundingBox, FaceDetector};
use image_input::GrayFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{load_error, ModelError};

/// Upscale factor applied when the caller asks for upsampling
pub const UPSAMPLE_FACTOR: u32 = 2;

/// Sliding-window detector tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Smallest face side, in pixels, the detector looks for
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub window_step: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            window_step: 4,
        }
    }
}

/// Face detector backed by `rustface`.
///
/// The parsed model is read-only; each call builds a detector from a clone
/// of it, so concurrent requests never share mutable state.
pub struct SeetaFaceDetector {
    model: rustface::Model,
    settings: DetectorSettings,
}

impl SeetaFaceDetector {
    pub fn from_path(path: &Path, settings: DetectorSettings) -> Result<Self, ModelError> {
        info!("Loading face detection model from {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| load_error(path, e))?;
        Self::from_bytes(&bytes, settings).map_err(|e| match e {
            ModelError::ModelLoad { message, .. } => load_error(path, message),
            other => other,
        })
    }

    pub fn from_bytes(bytes: &[u8], settings: DetectorSettings) -> Result<Self, ModelError> {
        let model = rustface::read_model(Cursor::new(bytes))
            .map_err(|e| load_error(Path::new("<memory>"), e))?;
        Ok(Self { model, settings })
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&self, gray: &GrayFrame, upsample: bool) -> Result<Vec<BoundingBox>, AnalysisError> {
        let factor = if upsample { UPSAMPLE_FACTOR } else { 1 };
        let search = gray.upsample(factor);

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.settings.min_face_size * factor);
        detector.set_score_thresh(self.settings.score_threshold);
        detector.set_pyramid_scale_factor(self.settings.pyramid_scale_factor);
        detector.set_slide_window_step(self.settings.window_step, self.settings.window_step);

        let image = rustface::ImageData::new(&search.data, search.width, search.height);
        let faces = detector.detect(&image);
        debug!(faces = faces.len(), upsample, "SeetaFace detection");

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                scale_box(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                    factor,
                )
            })
            .collect()
    }
}

/// Map a box found on an image upscaled by `factor` back to original pixels
pub fn scale_box(
    x: i64,
    y: i64,
    width: i64,
    height: i64,
    factor: u32,
) -> Result<BoundingBox, AnalysisError> {
    let f = factor.max(1) as i64;
    BoundingBox::new(
        x.div_euclid(f),
        y.div_euclid(f),
        width / f,
        height / f,
    )
    .map_err(|e| AnalysisError::Detection(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_box_identity() {
        let b = scale_box(10, 20, 30, 40, 1).unwrap();
        assert_eq!(b, BoundingBox::new(10, 20, 30, 40).unwrap());
    }

    #[test]
    fn test_scale_box_halves_upsampled_coordinates() {
        let b = scale_box(101, 60, 200, 180, 2).unwrap();
        assert_eq!(b.left, 50);
        assert_eq!(b.top, 30);
        assert_eq!(b.width, 100);
        assert_eq!(b.height, 90);
    }

    #[test]
    fn test_scale_box_negative_origin_floors() {
        // SeetaFace can report boxes starting just outside the image
        let b = scale_box(-3, -1, 50, 50, 2).unwrap();
        assert_eq!((b.left, b.top), (-2, -1));
    }

    #[test]
    fn test_scale_box_rejects_empty() {
        assert!(scale_box(0, 0, 0, 10, 1).is_err());
    }

    #[test]
    fn test_default_settings() {
        let s = DetectorSettings::default();
        assert_eq!(s.min_face_size, 20);
        assert_eq!(s.window_step, 4);
    }
}
