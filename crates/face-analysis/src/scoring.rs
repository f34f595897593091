//! Feature scorers over the landmark set
//!
//! Each scorer reads the shared landmark set and produces one report field.

use face_geometry::{euclidean_distance, eye_aspect_ratio, polygon_area, round_to};
use serde::{Deserialize, Serialize};

use crate::landmarks::{index, BoundingBox, LandmarkSet};
use crate::AnalysisError;

/// Which eyes are closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeStatus {
    Left,
    Right,
    Both,
    #[serde(rename = "none")]
    Neither,
}

/// Eye openness measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EyeState {
    pub left_eye_area: f64,
    pub right_eye_area: f64,
    /// Eye aspect ratios, `[left, right]`
    pub score: [f64; 2],
    pub status: EyeStatus,
}

/// Mouth openness score (percent) and verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MouthState {
    pub score: f64,
    pub status: bool,
}

/// Outcome of the face-count and containment gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceGate {
    /// Exactly one face, fully inside the image
    Accepted(BoundingBox),
    /// Recognised unusable image, with the reason reported to the client
    Rejected(String),
}

/// Require exactly one detected face whose box lies strictly inside the image
pub fn gate_faces(faces: &[BoundingBox], image_width: u32, image_height: u32) -> FaceGate {
    match faces {
        [] => FaceGate::Rejected("no faces detected".to_string()),
        [face] if face.contained_in(image_width, image_height) => FaceGate::Accepted(*face),
        [_] => FaceGate::Rejected("Bounding box wasn't contained".to_string()),
        many => FaceGate::Rejected(format!("Detected {} faces", many.len())),
    }
}

/// Classify eye closure from the two aspect ratios
pub fn classify_eyes(left_ear: f64, right_ear: f64, threshold: f64) -> EyeStatus {
    match (left_ear < threshold, right_ear < threshold) {
        (true, true) => EyeStatus::Both,
        (true, false) => EyeStatus::Left,
        (false, true) => EyeStatus::Right,
        (false, false) => EyeStatus::Neither,
    }
}

/// Eye aspect ratios and contour areas for both eyes.
///
/// The ratio uses all six eye points, the area polygon the first five.
/// Ratios are rounded before classification so the status always agrees with
/// the reported score.
pub fn score_eyes(
    landmarks: &LandmarkSet,
    threshold: f64,
    decimal_precision: u32,
) -> Result<EyeState, AnalysisError> {
    let left = landmarks.slice(index::LEFT_EYE);
    let right = landmarks.slice(index::RIGHT_EYE);

    let left_ear = round_to(eye_aspect_ratio(left)?, decimal_precision);
    let right_ear = round_to(eye_aspect_ratio(right)?, decimal_precision);

    Ok(EyeState {
        left_eye_area: round_to(
            polygon_area(landmarks.slice(index::LEFT_EYE_AREA))?,
            decimal_precision,
        ),
        right_eye_area: round_to(
            polygon_area(landmarks.slice(index::RIGHT_EYE_AREA))?,
            decimal_precision,
        ),
        score: [left_ear, right_ear],
        status: classify_eyes(left_ear, right_ear, threshold),
    })
}

/// Mouth-open score from inner and outer lip areas:
/// `100 * inner / (outer - inner)`.
///
/// A non-positive lip area has no meaningful score and is an error.
pub fn mouth_open_from_areas(
    inner_area: f64,
    outer_area: f64,
    threshold: f64,
    decimal_precision: u32,
) -> Result<MouthState, AnalysisError> {
    let lip_area = outer_area - inner_area;
    if lip_area <= 0.0 || !lip_area.is_finite() {
        return Err(AnalysisError::Computation(format!(
            "degenerate lip area {} (outer {}, inner {})",
            lip_area, outer_area, inner_area
        )));
    }

    let score = round_to(100.0 * inner_area / lip_area, decimal_precision);
    Ok(MouthState {
        score,
        status: score > threshold,
    })
}

/// Mouth-open score from the lip contours
pub fn score_mouth(
    landmarks: &LandmarkSet,
    threshold: f64,
    decimal_precision: u32,
) -> Result<MouthState, AnalysisError> {
    let inner = polygon_area(landmarks.slice(index::INNER_MOUTH))?;
    let outer = polygon_area(landmarks.slice(index::OUTER_MOUTH))?;
    mouth_open_from_areas(inner, outer, threshold, decimal_precision)
}

/// Distance between the outer eye corners, nearest whole pixel
pub fn eye_distance(landmarks: &LandmarkSet) -> i64 {
    let d = euclidean_distance(
        landmarks.point(index::LEFT_EYE_LEFT),
        landmarks.point(index::RIGHT_EYE_RIGHT),
    );
    d.round_ties_even() as i64
}
