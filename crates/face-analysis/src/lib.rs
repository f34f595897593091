//! Face Quality Analysis
//!
//! Single-image face quality report built from 68 facial landmarks:
//! - Face-count gate and bounding-box containment
//! - Head pose (roll, pitch, yaw) from a perspective-n-point solve
//! - Eye state from the eye aspect ratio
//! - Mouth-open score from lip polygon areas
//! - Inter-eye distance
//!
//! The face detector and landmark predictor are external models reached
//! through the [`FaceDetector`] and [`LandmarkPredictor`] traits.

pub mod analyzer;
pub mod config;
pub mod detector;
pub mod landmarks;
pub mod pose;
pub mod report;
pub mod scoring;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use analyzer::{FaceAnalyzer, Stage};
pub use config::AnalysisConfig;
pub use detector::{FaceDetector, LandmarkPredictor};
pub use landmarks::{BoundingBox, LandmarkSet, NamedLandmarks, LANDMARK_COUNT};
pub use pose::{estimate_pose, AxisPose, CameraModel, CameraPose, PoseEstimate};
pub use report::{FaceDetails, FaceReport};
pub use scoring::{EyeState, EyeStatus, MouthState};

use face_geometry::GeometryError;
use image_input::ImageError;
use thiserror::Error;

/// Analysis error types
///
/// Recognised unsuccessful outcomes (no face, several faces, face touching the
/// image border) are not errors; they produce a report with `success == false`.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pose estimation failed: {0}")]
    PoseEstimationFailed(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("Landmark prediction failed: {0}")]
    Landmarking(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}

impl AnalysisError {
    /// Stable machine-readable error class
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::PoseEstimationFailed(_) => "pose_estimation_failed",
            AnalysisError::Computation(_) => "computation_error",
            AnalysisError::Detection(_) => "detection_failed",
            AnalysisError::Landmarking(_) => "landmarking_failed",
            AnalysisError::Image(_) => "image_error",
        }
    }
}

impl From<GeometryError> for AnalysisError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InvalidInput(msg) => AnalysisError::InvalidInput(msg),
            GeometryError::DegenerateGeometry(msg) => AnalysisError::Computation(msg),
        }
    }
}
