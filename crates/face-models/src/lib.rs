//! Model Backends
//!
//! Concrete detection and landmarking models for the face quality report:
//! - SeetaFace frontal face detector (`rustface`)
//! - 68-point landmark regressor in ONNX format (`tract-onnx`)
//!
//! Both are loaded once into [`ModelHandles`] and shared read-only between
//! requests.

mod landmarks;
mod seeta;

pub use landmarks::{OnnxLandmarkPredictor, LANDMARK_INPUT_SIZE};
pub use seeta::{DetectorSettings, SeetaFaceDetector};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use face_analysis::{FaceDetector, LandmarkPredictor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Model loading and inference errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model load failed for {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Locations of the model files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPaths {
    /// SeetaFace frontal detector (`seeta_fd_frontal_v1.0.bin`)
    pub detector: PathBuf,
    /// ONNX 68-point landmark regressor
    pub landmarks: PathBuf,
}

/// Loaded models, shared by every request
#[derive(Clone)]
pub struct ModelHandles {
    pub detector: Arc<dyn FaceDetector>,
    pub predictor: Arc<dyn LandmarkPredictor>,
}

impl ModelHandles {
    /// Load both models from disk
    pub fn load(paths: &ModelPaths, settings: DetectorSettings) -> Result<Self, ModelError> {
        let detector = SeetaFaceDetector::from_path(&paths.detector, settings)?;
        let predictor = OnnxLandmarkPredictor::from_path(&paths.landmarks)?;
        info!(
            detector = %paths.detector.display(),
            landmarks = %paths.landmarks.display(),
            "Models loaded"
        );
        Ok(Self {
            detector: Arc::new(detector),
            predictor: Arc::new(predictor),
        })
    }
}

pub(crate) fn load_error(path: &Path, err: impl std::fmt::Display) -> ModelError {
    ModelError::ModelLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
