//! Single-image report pipeline

use std::sync::Arc;
use std::time::Instant;

use face_geometry::round_to;
use image_input::ImageFrame;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::detector::{FaceDetector, LandmarkPredictor};
use crate::pose::estimate_pose;
use crate::report::{FaceDetails, FaceReport};
use crate::scoring::{eye_distance, gate_faces, score_eyes, score_mouth, FaceGate};
use crate::AnalysisError;

/// Pipeline stage, logged as a request moves through the analyzer.
///
/// `Detecting -> Failed -> Reported` or
/// `Detecting -> Detected -> Landmarking -> Scoring -> Reported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detecting,
    Failed,
    Detected,
    Landmarking,
    Scoring,
    Reported,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detecting => "detecting",
            Stage::Failed => "failed",
            Stage::Detected => "detected",
            Stage::Landmarking => "landmarking",
            Stage::Scoring => "scoring",
            Stage::Reported => "reported",
        }
    }
}

/// Builds a [`FaceReport`] for one image at a time.
///
/// Holds only read-only state; one analyzer serves concurrent requests.
#[derive(Clone)]
pub struct FaceAnalyzer {
    config: AnalysisConfig,
    detector: Arc<dyn FaceDetector>,
    predictor: Arc<dyn LandmarkPredictor>,
}

impl FaceAnalyzer {
    pub fn new(
        config: AnalysisConfig,
        detector: Arc<dyn FaceDetector>,
        predictor: Arc<dyn LandmarkPredictor>,
    ) -> Self {
        Self {
            config,
            detector,
            predictor,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Decode an uploaded image and analyse it. Decoding counts towards the
    /// reported elapsed time.
    pub fn analyze_blob(&self, file_name: &str, bytes: &[u8]) -> Result<FaceReport, AnalysisError> {
        let started = Instant::now();
        let frame = ImageFrame::decode(bytes)?;
        self.run(file_name, &frame, started)
    }

    /// Analyse an already decoded image
    pub fn analyze(
        &self,
        file_name: &str,
        frame: &ImageFrame,
    ) -> Result<FaceReport, AnalysisError> {
        self.run(file_name, frame, Instant::now())
    }

    fn run(
        &self,
        file_name: &str,
        frame: &ImageFrame,
        started: Instant,
    ) -> Result<FaceReport, AnalysisError> {
        let dp = self.config.decimal_precision;
        let gray = frame.to_grayscale();

        self.enter(Stage::Detecting, file_name);
        let faces = self.timed("detect", || self.detector.detect(&gray, self.config.upsample))?;

        let face = match gate_faces(&faces, frame.width, frame.height) {
            FaceGate::Accepted(face) => face,
            FaceGate::Rejected(reason) => {
                self.enter(Stage::Failed, file_name);
                info!(file_name, faces = faces.len(), %reason, "Image rejected");
                let report = FaceReport::unsuccessful(
                    file_name,
                    faces.len(),
                    reason,
                    round_to(started.elapsed().as_secs_f64(), dp),
                );
                self.enter(Stage::Reported, file_name);
                return Ok(report);
            }
        };
        self.enter(Stage::Detected, file_name);

        self.enter(Stage::Landmarking, file_name);
        let landmarks = self.timed("landmarks", || self.predictor.predict(&gray, &face))?;

        self.enter(Stage::Scoring, file_name);
        let pose = self
            .timed("pose", || estimate_pose(&landmarks, frame.width, frame.height, dp))
            .map_err(|e| {
                warn!(file_name, error = %e, "Pose estimation failed");
                e
            })?;
        let eyes_closed = self.timed("eyes", || {
            score_eyes(&landmarks, self.config.eyes_closed_threshold, dp)
        })?;
        let mouth_open = self.timed("mouth", || {
            score_mouth(&landmarks, self.config.mouth_open_threshold, dp)
        })?;
        let eye_distance = eye_distance(&landmarks);

        let details = FaceDetails {
            bounding_box: face,
            eye_distance,
            eyes_closed,
            landmarks: landmarks.named(),
            full_facial_landmarks: landmarks,
            mouth_open,
            pose,
        };
        let report = FaceReport::successful(
            file_name,
            details,
            round_to(started.elapsed().as_secs_f64(), dp),
        );
        self.enter(Stage::Reported, file_name);
        info!(file_name, elapsed = report.time_elapsed, "Face report ready");
        Ok(report)
    }

    fn enter(&self, stage: Stage, file_name: &str) {
        debug!(file_name, stage = stage.as_str(), "Stage");
    }

    fn timed<T>(&self, step: &'static str, f: impl FnOnce() -> T) -> T {
        if !self.config.timing {
            return f();
        }
        let start = Instant::now();
        let out = f();
        debug!(step, elapsed_ms = start.elapsed().as_secs_f64() * 1000.0, "Timing");
        out
    }
}
