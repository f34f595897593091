//! Seams to the external face detector and landmark predictor

use image_input::GrayFrame;

use crate::landmarks::{BoundingBox, LandmarkSet};
use crate::AnalysisError;

/// Finds face bounding boxes in a gray image.
///
/// Implementations share read-only model state across requests and must be
/// callable from several threads at once.
pub trait FaceDetector: Send + Sync {
    /// Detect every face; `upsample` asks for a 2x upscale before searching,
    /// with boxes reported in the original image's coordinates.
    fn detect(&self, gray: &GrayFrame, upsample: bool) -> Result<Vec<BoundingBox>, AnalysisError>;
}

/// Places the 68 canonical landmarks inside a detected face box
pub trait LandmarkPredictor: Send + Sync {
    fn predict(&self, gray: &GrayFrame, face: &BoundingBox) -> Result<LandmarkSet, AnalysisError>;
}
