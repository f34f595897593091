//! Landmark layout and face bounding boxes

use std::ops::Range;

use face_geometry::Point2D;
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// Number of points produced by the landmark predictor
pub const LANDMARK_COUNT: usize = 68;

/// Canonical 68-point indices (iBUG layout)
pub mod index {
    use std::ops::Range;

    pub const CHEEK_LEFT: usize = 0;
    pub const CHIN: usize = 8;
    pub const CHEEK_RIGHT: usize = 16;
    pub const NOSE_TIP: usize = 30;
    pub const LEFT_EYE_LEFT: usize = 36;
    pub const RIGHT_EYE_RIGHT: usize = 45;
    pub const MOUTH_LEFT: usize = 48;
    pub const MOUTH_RIGHT: usize = 54;

    pub const LEFT_EYE: Range<usize> = 36..42;
    pub const RIGHT_EYE: Range<usize> = 42..48;
    /// Eye area polygons leave out the last lower-lid point
    pub const LEFT_EYE_AREA: Range<usize> = 36..41;
    pub const RIGHT_EYE_AREA: Range<usize> = 42..47;
    pub const OUTER_MOUTH: Range<usize> = 48..60;
    pub const INNER_MOUTH: Range<usize> = 60..68;
}

/// Exactly 68 landmarks in canonical order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct LandmarkSet {
    points: Vec<Point2D>,
}

impl LandmarkSet {
    /// Wrap predictor output, rejecting anything but 68 points
    pub fn new(points: Vec<Point2D>) -> Result<Self, AnalysisError> {
        if points.len() != LANDMARK_COUNT {
            return Err(AnalysisError::InvalidInput(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn point(&self, index: usize) -> Point2D {
        self.points[index]
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Contiguous run of landmarks, e.g. [`index::LEFT_EYE`]
    pub fn slice(&self, range: Range<usize>) -> &[Point2D] {
        &self.points[range]
    }

    pub fn named(&self) -> NamedLandmarks {
        NamedLandmarks {
            chin: self.point(index::CHIN),
            left_eye_left: self.point(index::LEFT_EYE_LEFT),
            mouth_left: self.point(index::MOUTH_LEFT),
            mouth_right: self.point(index::MOUTH_RIGHT),
            nose: self.point(index::NOSE_TIP),
            right_eye_right: self.point(index::RIGHT_EYE_RIGHT),
        }
    }

    /// Left and right cheek points; measured but never reported
    pub fn cheeks(&self) -> (Point2D, Point2D) {
        (self.point(index::CHEEK_LEFT), self.point(index::CHEEK_RIGHT))
    }
}

impl TryFrom<Vec<Point2D>> for LandmarkSet {
    type Error = AnalysisError;

    fn try_from(points: Vec<Point2D>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point2D> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// The individually reported landmarks.
///
/// Fields are declared in key order so the payload comes out sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedLandmarks {
    pub chin: Point2D,
    pub left_eye_left: Point2D,
    pub mouth_left: Point2D,
    pub mouth_right: Point2D,
    pub nose: Point2D,
    pub right_eye_right: Point2D,
}

/// Face bounding box in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub height: i64,
    pub left: i64,
    pub top: i64,
    pub width: i64,
}

impl BoundingBox {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Result<Self, AnalysisError> {
        if width <= 0 || height <= 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "bounding box must have positive size, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            height,
            left,
            top,
            width,
        })
    }

    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    /// Strictly inside the image: a box touching any edge is rejected
    pub fn contained_in(&self, image_width: u32, image_height: u32) -> bool {
        self.left > 0
            && self.top > 0
            && self.right() < image_width as i64
            && self.bottom() < image_height as i64
    }
}
