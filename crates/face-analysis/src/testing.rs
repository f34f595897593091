//! Deterministic stand-ins for the external models
//!
//! [`synthetic_landmarks`] draws a frontal face inside a box: the six pose
//! landmarks are exact projections of the head model under an upright pose,
//! eye and lip contours are generated to hit a requested openness, and the
//! remaining points follow a mean 68-point shape.

use std::f64::consts::PI;

use face_geometry::Point2D;
use image_input::GrayFrame;
use nalgebra::{Rotation3, Vector3};

use crate::detector::{FaceDetector, LandmarkPredictor};
use crate::landmarks::{index, BoundingBox, LandmarkSet, LANDMARK_COUNT};
use crate::pose::{CameraModel, CameraPose, MODEL_POINTS, POSE_LANDMARKS};
use crate::AnalysisError;

/// Mean frontal 68-point shape, normalised to the face box
pub const FRONTAL_TEMPLATE: [[f64; 2]; 68] = [
    [0.0792, 0.3392], [0.0829, 0.4570], [0.0968, 0.5756], [0.1221, 0.6919],
    [0.1687, 0.8003], [0.2398, 0.8957], [0.3257, 0.9771], [0.4223, 1.0433],
    [0.5318, 1.0608], [0.6413, 1.0398], [0.7381, 0.9723], [0.8244, 0.8896],
    [0.8948, 0.7925], [0.9394, 0.6815], [0.9611, 0.5622], [0.9706, 0.4418],
    [0.9712, 0.3221], [0.1638, 0.2492], [0.2178, 0.2043], [0.2913, 0.1924],
    [0.3675, 0.2036], [0.4393, 0.2331], [0.5864, 0.2281], [0.6602, 0.1959],
    [0.7375, 0.1824], [0.8132, 0.1928], [0.8708, 0.2353], [0.5153, 0.3186],
    [0.5162, 0.3962], [0.5171, 0.4738], [0.5182, 0.5532], [0.4337, 0.6041],
    [0.4755, 0.6208], [0.5207, 0.6343], [0.5659, 0.6188], [0.6071, 0.6016],
    [0.2524, 0.3311], [0.2987, 0.3026], [0.3557, 0.3030], [0.4037, 0.3387],
    [0.3525, 0.3500], [0.2968, 0.3505], [0.6313, 0.3341], [0.6791, 0.2965],
    [0.7360, 0.2947], [0.7829, 0.3213], [0.7403, 0.3418], [0.6850, 0.3437],
    [0.3532, 0.7462], [0.4146, 0.7191], [0.4777, 0.7068], [0.5227, 0.7171],
    [0.5698, 0.7054], [0.6352, 0.7157], [0.6995, 0.7394], [0.6394, 0.8052],
    [0.5764, 0.8354], [0.5254, 0.8417], [0.4764, 0.8375], [0.4138, 0.8100],
    [0.3801, 0.7500], [0.4780, 0.7451], [0.5234, 0.7489], [0.5711, 0.7433],
    [0.6724, 0.7442], [0.5725, 0.7766], [0.5240, 0.7834], [0.4776, 0.7814],
];

/// Openness of the drawn face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceShape {
    /// Eye aspect ratio of both eyes
    pub eye_aspect_ratio: f64,
    /// Inner lip half-height relative to the mouth half-width
    pub mouth_opening: f64,
}

impl FaceShape {
    pub const fn open_eyes_closed_mouth() -> Self {
        Self {
            eye_aspect_ratio: 0.35,
            mouth_opening: 0.0,
        }
    }

    pub const fn closed_eyes() -> Self {
        Self {
            eye_aspect_ratio: 0.1,
            mouth_opening: 0.0,
        }
    }

    pub const fn open_mouth() -> Self {
        Self {
            eye_aspect_ratio: 0.35,
            mouth_opening: 0.3,
        }
    }
}

impl Default for FaceShape {
    fn default() -> Self {
        Self::open_eyes_closed_mouth()
    }
}

/// Upright frontal pose placing the model's eye corners and nose tip where
/// the template puts them inside `face`
pub fn frontal_pose(face: &BoundingBox, camera: &CameraModel) -> CameraPose {
    let w = face.width as f64;
    let eye_span = (FRONTAL_TEMPLATE[index::RIGHT_EYE_RIGHT][0]
        - FRONTAL_TEMPLATE[index::LEFT_EYE_LEFT][0])
        * w;
    let model_span = MODEL_POINTS[3][0] - MODEL_POINTS[2][0];
    // eye corners sit 135 units behind the nose tip
    let depth = camera.focal_length * model_span / eye_span + MODEL_POINTS[2][2];

    let nose = template_point(face, index::NOSE_TIP);
    CameraPose {
        rotation: Rotation3::from_axis_angle(&Vector3::x_axis(), PI),
        translation: Vector3::new(
            (nose.x - camera.center.x) * depth / camera.focal_length,
            (nose.y - camera.center.y) * depth / camera.focal_length,
            depth,
        ),
    }
}

fn template_point(face: &BoundingBox, i: usize) -> Point2D {
    let [tx, ty] = FRONTAL_TEMPLATE[i];
    Point2D::new(
        face.left as f64 + tx * face.width as f64,
        face.top as f64 + ty * face.height as f64,
    )
}

/// Draw a frontal face with the requested openness inside `face`
pub fn synthetic_landmarks(
    face: &BoundingBox,
    image_width: u32,
    image_height: u32,
    shape: FaceShape,
) -> LandmarkSet {
    let mut points: Vec<Point2D> = (0..FRONTAL_TEMPLATE.len())
        .map(|i| template_point(face, i))
        .collect();

    let camera = CameraModel::for_image(image_width, image_height);
    let pose = frontal_pose(face, &camera);
    for (&slot, &[x, y, z]) in POSE_LANDMARKS.iter().zip(MODEL_POINTS.iter()) {
        points[slot] = camera.project(&pose, &Vector3::new(x, y, z));
    }

    for eye in [index::LEFT_EYE, index::RIGHT_EYE] {
        let start = eye.start;
        let (c0, c3) = (points[start], points[start + 3]);
        let (ux, uy) = (c3.x - c0.x, c3.y - c0.y);
        let width = ux.hypot(uy);
        // unit normal pointing down the image
        let (nx, ny) = (-uy / width, ux / width);
        let h = shape.eye_aspect_ratio * width / 2.0;
        let at = |t: f64, s: f64| Point2D::new(c0.x + ux * t + nx * s, c0.y + uy * t + ny * s);
        points[start + 1] = at(1.0 / 3.0, -h);
        points[start + 2] = at(2.0 / 3.0, -h);
        points[start + 4] = at(2.0 / 3.0, h);
        points[start + 5] = at(1.0 / 3.0, h);
    }

    let (left, right) = (points[index::MOUTH_LEFT], points[index::MOUTH_RIGHT]);
    let center = Point2D::new((left.x + right.x) / 2.0, (left.y + right.y) / 2.0);
    let (ux, uy) = ((right.x - left.x) / 2.0, (right.y - left.y) / 2.0);
    let half_width = ux.hypot(uy);
    let (nx, ny) = (-uy / half_width, ux / half_width);
    let ellipse = |k: usize, n: usize, a: f64, b: f64| {
        let theta = PI * 2.0 * k as f64 / n as f64;
        Point2D::new(
            center.x - ux * a * theta.cos() - nx * b * theta.sin(),
            center.y - uy * a * theta.cos() - ny * b * theta.sin(),
        )
    };
    let outer = index::OUTER_MOUTH;
    for k in 1..outer.len() {
        if outer.start + k != index::MOUTH_RIGHT {
            points[outer.start + k] = ellipse(k, outer.len(), 1.0, 0.5 * half_width);
        }
    }
    let inner = index::INNER_MOUTH;
    for k in 0..inner.len() {
        points[inner.start + k] = ellipse(k, inner.len(), 0.8, shape.mouth_opening * half_width);
    }

    LandmarkSet::new(points).expect("template has 68 points")
}

/// Detector returning a fixed list of boxes
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    pub faces: Vec<BoundingBox>,
}

impl StaticDetector {
    pub fn new(faces: Vec<BoundingBox>) -> Self {
        Self { faces }
    }
}

impl FaceDetector for StaticDetector {
    fn detect(
        &self,
        _gray: &GrayFrame,
        _upsample: bool,
    ) -> Result<Vec<BoundingBox>, AnalysisError> {
        Ok(self.faces.clone())
    }
}

/// Predictor drawing [`synthetic_landmarks`] into whatever box it is given
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticPredictor {
    pub shape: FaceShape,
}

impl SyntheticPredictor {
    pub fn new(shape: FaceShape) -> Self {
        Self { shape }
    }
}

impl LandmarkPredictor for SyntheticPredictor {
    fn predict(&self, gray: &GrayFrame, face: &BoundingBox) -> Result<LandmarkSet, AnalysisError> {
        Ok(synthetic_landmarks(face, gray.width, gray.height, self.shape))
    }
}

/// Predictor that always fails, for error-path tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPredictor;

impl LandmarkPredictor for FailingPredictor {
    fn predict(
        &self,
        _gray: &GrayFrame,
        _face: &BoundingBox,
    ) -> Result<LandmarkSet, AnalysisError> {
        Err(AnalysisError::Landmarking("predictor unavailable".to_string()))
    }
}

/// Predictor returning the same landmarks for every face
#[derive(Debug, Clone)]
pub struct FixedPredictor {
    pub landmarks: LandmarkSet,
}

impl FixedPredictor {
    pub fn new(landmarks: LandmarkSet) -> Self {
        Self { landmarks }
    }

    /// All 68 points at one pixel: no pose can be recovered
    pub fn collapsed(x: f64, y: f64) -> Self {
        let points = vec![Point2D::new(x, y); LANDMARK_COUNT];
        Self::new(LandmarkSet::new(points).expect("68 points"))
    }
}

impl LandmarkPredictor for FixedPredictor {
    fn predict(
        &self,
        _gray: &GrayFrame,
        _face: &BoundingBox,
    ) -> Result<LandmarkSet, AnalysisError> {
        Ok(self.landmarks.clone())
    }
}
