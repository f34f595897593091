//! Head pose estimation
//!
//! Six landmarks are matched against a generic anthropometric head model and
//! the camera pose is recovered with a perspective-n-point solve:
//!
//! 1. Camera intrinsics are approximated from the image size alone, assuming
//!    a 60 degree horizontal field of view and no lens distortion.
//! 2. A direct linear transform gives an initial pose; an upright frontal
//!    guess is tried as well.
//! 3. Levenberg-Marquardt refines each starting pose on reprojection error and
//!    the best converged one wins.
//! 4. The rotation is split into Euler angles with the RQ (Givens) convention.
//!
//! Both the head model and the field of view are rough approximations. They
//! are kept fixed so results stay comparable across deployments.

use std::f64::consts::PI;

use face_geometry::{round_to, Point2D};
use nalgebra::{
    DMatrix, Matrix3, Matrix4, Rotation3, SMatrix, SVector, UnitQuaternion, Vector2, Vector3,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::landmarks::{index, LandmarkSet};
use crate::AnalysisError;

/// Landmarks used for the pose solve, paired with [`MODEL_POINTS`]
pub const POSE_LANDMARKS: [usize; 6] = [
    index::NOSE_TIP,
    index::CHIN,
    index::LEFT_EYE_LEFT,
    index::RIGHT_EYE_RIGHT,
    index::MOUTH_LEFT,
    index::MOUTH_RIGHT,
];

/// Generic 3D head model, nose tip at the origin, y up
pub const MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],          // Nose tip
    [0.0, -330.0, -65.0],     // Chin
    [-225.0, 170.0, -135.0],  // Left eye left corner
    [225.0, 170.0, -135.0],   // Right eye right corner
    [-150.0, -150.0, -125.0], // Left mouth corner
    [150.0, -150.0, -125.0],  // Right mouth corner
];

/// Assumed horizontal field of view of the camera
pub const HORIZONTAL_FOV_DEGREES: f64 = 60.0;

/// Length of the projected pose-indicator axes, in model units
pub const AXIS_LENGTH: f64 = 500.0;

const MAX_ITERATIONS: usize = 100;
const MIN_DEPTH: f64 = 1e-9;

type Params = SVector<f64, 6>;
type Residuals = SVector<f64, 12>;
type Jacobian = SMatrix<f64, 12, 6>;

/// Pinhole camera approximated from the image dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub focal_length: f64,
    pub center: Point2D,
}

impl CameraModel {
    pub fn for_image(width: u32, height: u32) -> Self {
        let center = Point2D::new(width as f64 / 2.0, height as f64 / 2.0);
        let focal_length = center.x / (HORIZONTAL_FOV_DEGREES / 2.0).to_radians().tan();
        Self {
            focal_length,
            center,
        }
    }

    /// Project a model-space point through `pose` into pixel coordinates
    pub fn project(&self, pose: &CameraPose, point: &Vector3<f64>) -> Point2D {
        let cam = pose.rotation * point + pose.translation;
        Point2D::new(
            self.focal_length * cam.x / cam.z + self.center.x,
            self.focal_length * cam.y / cam.z + self.center.y,
        )
    }

    fn normalize(&self, p: Point2D) -> Vector2<f64> {
        Vector2::new(
            (p.x - self.center.x) / self.focal_length,
            (p.y - self.center.y) / self.focal_length,
        )
    }
}

/// Rotation and translation taking model coordinates into camera coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl CameraPose {
    fn from_params(x: &Params) -> Self {
        Self {
            rotation: Rotation3::new(Vector3::new(x[0], x[1], x[2])),
            translation: Vector3::new(x[3], x[4], x[5]),
        }
    }

    fn to_params(self) -> Params {
        // via the quaternion: the matrix route loses the axis at 180 degrees
        let r = UnitQuaternion::from_rotation_matrix(&self.rotation).scaled_axis();
        let t = self.translation;
        Params::from_column_slice(&[r.x, r.y, r.z, t.x, t.y, t.z])
    }

    /// Raw Euler angles in degrees, `(x, y, z)`, via RQ decomposition
    pub fn euler_degrees(&self) -> Vector3<f64> {
        rq_euler_degrees(self.rotation.matrix())
    }
}

/// One reported pose angle with its projected indicator endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AxisPose {
    pub degrees: f64,
    #[serde(rename = "PFN")]
    pub pfn: [i64; 2],
}

/// Head pose in degrees plus pose-indicator points for overlays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PoseEstimate {
    pub pitch: AxisPose,
    pub roll: AxisPose,
    pub yaw: AxisPose,
}

/// Estimate head pose from the landmark set.
///
/// Roll is reported with its sign flipped; pitch and yaw keep the sign of the
/// decomposition. Indicator endpoints are the model's x, y and z axes (in that
/// order for roll, pitch and yaw) projected into the image.
pub fn estimate_pose(
    landmarks: &LandmarkSet,
    image_width: u32,
    image_height: u32,
    decimal_precision: u32,
) -> Result<PoseEstimate, AnalysisError> {
    let camera = CameraModel::for_image(image_width, image_height);
    let image_points = POSE_LANDMARKS.map(|i| landmarks.point(i));
    let pose = solve_pnp(&image_points, &camera)?;

    let euler = pose.euler_degrees();
    let axes = [
        Vector3::new(AXIS_LENGTH, 0.0, 0.0),
        Vector3::new(0.0, AXIS_LENGTH, 0.0),
        Vector3::new(0.0, 0.0, AXIS_LENGTH),
    ];
    let mut pfn = [[0i64; 2]; 3];
    for (slot, axis) in pfn.iter_mut().zip(axes.iter()) {
        let p = camera.project(&pose, axis);
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(AnalysisError::PoseEstimationFailed(
                "pose axis projects to infinity".to_string(),
            ));
        }
        let p = p.rounded();
        *slot = [p.x as i64, p.y as i64];
    }

    Ok(PoseEstimate {
        roll: AxisPose {
            degrees: round_to(-euler.z, decimal_precision),
            pfn: pfn[0],
        },
        pitch: AxisPose {
            degrees: round_to(euler.x, decimal_precision),
            pfn: pfn[1],
        },
        yaw: AxisPose {
            degrees: round_to(euler.y, decimal_precision),
            pfn: pfn[2],
        },
    })
}

/// Recover the camera pose from the six pose landmarks
pub fn solve_pnp(
    image_points: &[Point2D; 6],
    camera: &CameraModel,
) -> Result<CameraPose, AnalysisError> {
    let model = MODEL_POINTS.map(|[x, y, z]| Vector3::new(x, y, z));
    let observed = image_points.map(|p| camera.normalize(p));

    if observed.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(AnalysisError::InvalidInput(
            "pose landmarks must be finite".to_string(),
        ));
    }

    let mut starts = Vec::with_capacity(2);
    match dlt_pose(&model, &observed) {
        Some(pose) => starts.push(pose),
        None => debug!("linear pose estimate unusable, relying on frontal start"),
    }
    starts.push(frontal_pose(&observed));

    let mut best: Option<(CameraPose, f64)> = None;
    for start in starts {
        match refine(&model, &observed, start) {
            Some((pose, cost)) => {
                if best.map_or(true, |(_, c)| cost < c) {
                    best = Some((pose, cost));
                }
            }
            None => debug!("pose refinement did not converge from one starting point"),
        }
    }

    match best {
        Some((pose, cost)) => {
            let rms_px = (cost / 6.0).sqrt() * camera.focal_length;
            debug!(rms_px, "pose solved");
            Ok(pose)
        }
        None => {
            warn!("perspective-n-point solve failed for every starting pose");
            Err(AnalysisError::PoseEstimationFailed(
                "solver did not converge".to_string(),
            ))
        }
    }
}

/// Direct linear transform on normalized image coordinates
fn dlt_pose(model: &[Vector3<f64>; 6], observed: &[Vector2<f64>; 6]) -> Option<CameraPose> {
    // Condition the model points: centroid at origin, mean distance sqrt(3)
    let centroid = model.iter().fold(Vector3::zeros(), |acc, p| acc + p) / 6.0;
    let mean_dist = model.iter().map(|p| (p - centroid).norm()).sum::<f64>() / 6.0;
    if mean_dist <= 0.0 {
        return None;
    }
    let scale = 3f64.sqrt() / mean_dist;

    let mut a = DMatrix::<f64>::zeros(12, 12);
    for (i, (p, u)) in model.iter().zip(observed.iter()).enumerate() {
        let q = (p - centroid) * scale;
        let row = [q.x, q.y, q.z, 1.0];
        for k in 0..4 {
            a[(2 * i, k)] = row[k];
            a[(2 * i, 8 + k)] = -u.x * row[k];
            a[(2 * i + 1, 4 + k)] = row[k];
            a[(2 * i + 1, 8 + k)] = -u.y * row[k];
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|l, r| l.1.total_cmp(r.1))?;
    let h = v_t.row(min_idx);

    // P' acts on conditioned points; undo the conditioning: P = P' * T
    let p_cond = SMatrix::<f64, 3, 4>::from_row_slice(&h.iter().copied().collect::<Vec<_>>());
    #[rustfmt::skip]
    let t = Matrix4::new(
        scale, 0.0, 0.0, -scale * centroid.x,
        0.0, scale, 0.0, -scale * centroid.y,
        0.0, 0.0, scale, -scale * centroid.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let mut p = p_cond * t;

    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();
    if m.determinant() < 0.0 {
        p = -p;
    }
    let m: Matrix3<f64> = p.fixed_view::<3, 3>(0, 0).into_owned();

    let svd_m = m.svd(true, true);
    let (u, v_t) = (svd_m.u?, svd_m.v_t?);
    let r = u * v_t;
    if r.determinant() <= 0.0 {
        return None;
    }
    let s = svd_m.singular_values.sum() / 3.0;
    if s <= 0.0 || !s.is_finite() {
        return None;
    }
    let translation: Vector3<f64> = p.column(3).into_owned() / s;

    let pose = CameraPose {
        rotation: Rotation3::from_matrix_unchecked(r),
        translation,
    };
    let in_front = model
        .iter()
        .all(|x| (pose.rotation * x + pose.translation).z > MIN_DEPTH);
    in_front.then_some(pose)
}

/// Upright face looking into the camera, placed so the eye corners span the
/// observed distance and the nose tip lands on its observed pixel
fn frontal_pose(observed: &[Vector2<f64>; 6]) -> CameraPose {
    let model_eye_span = MODEL_POINTS[3][0] - MODEL_POINTS[2][0];
    let eye_span = (observed[3] - observed[2]).norm();
    let depth = if eye_span > 0.0 {
        model_eye_span / eye_span
    } else {
        1000.0
    };
    let nose = observed[0];
    CameraPose {
        rotation: Rotation3::from_axis_angle(&Vector3::x_axis(), PI),
        translation: Vector3::new(nose.x * depth, nose.y * depth, depth),
    }
}

fn residuals(
    model: &[Vector3<f64>; 6],
    observed: &[Vector2<f64>; 6],
    x: &Params,
) -> Option<Residuals> {
    let pose = CameraPose::from_params(x);
    let mut r = Residuals::zeros();
    for (i, (p, u)) in model.iter().zip(observed.iter()).enumerate() {
        let cam = pose.rotation * p + pose.translation;
        if cam.z <= MIN_DEPTH {
            return None;
        }
        r[2 * i] = cam.x / cam.z - u.x;
        r[2 * i + 1] = cam.y / cam.z - u.y;
    }
    r.iter().all(|v| v.is_finite()).then_some(r)
}

fn jacobian(
    model: &[Vector3<f64>; 6],
    observed: &[Vector2<f64>; 6],
    x: &Params,
) -> Option<Jacobian> {
    let mut j = Jacobian::zeros();
    for k in 0..6 {
        let h = 1e-6 * x[k].abs().max(1.0);
        let mut forward = *x;
        let mut backward = *x;
        forward[k] += h;
        backward[k] -= h;
        let diff = (residuals(model, observed, &forward)? - residuals(model, observed, &backward)?)
            / (2.0 * h);
        j.set_column(k, &diff);
    }
    Some(j)
}

/// Levenberg-Marquardt on reprojection error. Returns the pose and its sum of
/// squared residuals (normalized units), or `None` if it never converged.
fn refine(
    model: &[Vector3<f64>; 6],
    observed: &[Vector2<f64>; 6],
    start: CameraPose,
) -> Option<(CameraPose, f64)> {
    let mut x = start.to_params();
    let mut r = residuals(model, observed, &x)?;
    let mut cost = r.norm_squared();
    let mut lambda = 1e-3;

    for iteration in 0..MAX_ITERATIONS {
        if cost < 1e-24 {
            return Some((CameraPose::from_params(&x), cost));
        }

        let j = jacobian(model, observed, &x)?;
        let jtj = j.transpose() * j;
        let gradient = j.transpose() * r;

        let mut damped = jtj;
        for i in 0..6 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }

        let step = damped.cholesky().map(|c| c.solve(&(-gradient)));
        let accepted = step.and_then(|delta| {
            let candidate = x + delta;
            let rc = residuals(model, observed, &candidate)?;
            let new_cost = rc.norm_squared();
            (new_cost < cost).then_some((delta, candidate, rc, new_cost))
        });

        match accepted {
            Some((delta, candidate, rc, new_cost)) => {
                let improvement = cost - new_cost;
                x = candidate;
                r = rc;
                let previous = cost;
                cost = new_cost;
                lambda = (lambda / 10.0).max(1e-12);

                if delta.norm() <= 1e-12 * (x.norm() + 1e-12) || improvement <= 1e-14 * previous {
                    debug!(iteration, "pose refinement converged");
                    return Some((CameraPose::from_params(&x), cost));
                }
            }
            None => {
                lambda *= 10.0;
                if lambda > 1e10 {
                    // No downhill step left: a local minimum
                    return Some((CameraPose::from_params(&x), cost));
                }
            }
        }
    }

    None
}

/// Euler angles in degrees from a rotation matrix, RQ decomposition with
/// Givens rotations about x, then y, then z.
#[rustfmt::skip]
fn rq_euler_degrees(m: &Matrix3<f64>) -> Vector3<f64> {
    let (s, c) = givens(m[(2, 1)], m[(2, 2)]);
    let qx = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, c, s,
        0.0, -s, c,
    );
    let r = m * qx;

    let (s, c) = givens(-r[(2, 0)], r[(2, 2)]);
    let qy = Matrix3::new(
        c, 0.0, -s,
        0.0, 1.0, 0.0,
        s, 0.0, c,
    );
    let r = r * qy;

    let (s, c) = givens(r[(1, 0)], r[(1, 1)]);
    let qz = Matrix3::new(
        c, s, 0.0,
        -s, c, 0.0,
        0.0, 0.0, 1.0,
    );

    Vector3::new(
        signed_angle(qx[(1, 1)], qx[(1, 2)]),
        signed_angle(qy[(0, 0)], qy[(2, 0)]),
        signed_angle(qz[(0, 0)], qz[(0, 1)]),
    )
}

fn givens(s: f64, c: f64) -> (f64, f64) {
    let z = 1.0 / (c * c + s * s + f64::EPSILON).sqrt();
    (s * z, c * z)
}

fn signed_angle(cos: f64, sin: f64) -> f64 {
    let angle = cos.clamp(-1.0, 1.0).acos().to_degrees();
    if sin >= 0.0 {
        angle
    } else {
        -angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 480;

    /// 68 points with the six pose landmarks projected from the head model
    fn projected_landmarks(rotation: Rotation3<f64>, translation: Vector3<f64>) -> LandmarkSet {
        let camera = CameraModel::for_image(WIDTH, HEIGHT);
        let pose = CameraPose {
            rotation,
            translation,
        };
        let mut points = vec![Point2D::new(320.0, 240.0); 68];
        for (idx, [x, y, z]) in POSE_LANDMARKS.iter().zip(MODEL_POINTS.iter()) {
            points[*idx] = camera.project(&pose, &Vector3::new(*x, *y, *z));
        }
        LandmarkSet::new(points).unwrap()
    }

    fn upright() -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), PI)
    }

    #[test]
    fn test_camera_model_from_image_size() {
        let camera = CameraModel::for_image(WIDTH, HEIGHT);
        assert_eq!(camera.center, Point2D::new(320.0, 240.0));
        // 320 / tan(30deg)
        assert!((camera.focal_length - 554.2562584).abs() < 1e-6);
    }

    #[test]
    fn test_identity_pose_reads_zero() {
        let landmarks = projected_landmarks(Rotation3::identity(), Vector3::new(0.0, 0.0, 1000.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 4).unwrap();
        assert!(pose.roll.degrees.abs() < 1e-2, "roll {}", pose.roll.degrees);
        assert!(pose.pitch.degrees.abs() < 1e-2, "pitch {}", pose.pitch.degrees);
        assert!(pose.yaw.degrees.abs() < 1e-2, "yaw {}", pose.yaw.degrees);
    }

    #[test]
    fn test_upright_face_pitch_wraps_to_half_turn() {
        // Model y points up, image y points down: a level upright face sits at
        // a half turn about x.
        let landmarks = projected_landmarks(upright(), Vector3::new(20.0, -15.0, 1200.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 4).unwrap();
        assert!((pose.pitch.degrees.abs() - 180.0).abs() < 1e-2, "pitch {}", pose.pitch.degrees);
        assert!(pose.yaw.degrees.abs() < 1e-2);
        assert!(pose.roll.degrees.abs() < 1e-2);
    }

    #[test]
    fn test_recovers_yaw() {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), 20f64.to_radians());
        let landmarks = projected_landmarks(rotation, Vector3::new(0.0, 0.0, 1500.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 4).unwrap();
        assert!((pose.yaw.degrees - 20.0).abs() < 1e-2, "yaw {}", pose.yaw.degrees);
        assert!(pose.pitch.degrees.abs() < 1e-2);
        assert!(pose.roll.degrees.abs() < 1e-2);
    }

    #[test]
    fn test_roll_sign_is_flipped() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 15f64.to_radians());
        let landmarks = projected_landmarks(rotation, Vector3::new(0.0, 0.0, 1500.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 4).unwrap();
        assert!((pose.roll.degrees + 15.0).abs() < 1e-2, "roll {}", pose.roll.degrees);
        assert!(pose.pitch.degrees.abs() < 1e-2);
        assert!(pose.yaw.degrees.abs() < 1e-2);
    }

    #[test]
    fn test_recovers_combined_rotation() {
        let rotation = upright()
            * Rotation3::from_euler_angles(
                8f64.to_radians(),
                -12f64.to_radians(),
                5f64.to_radians(),
            );
        let translation = Vector3::new(-40.0, 25.0, 1800.0);
        let camera = CameraModel::for_image(WIDTH, HEIGHT);
        let landmarks = projected_landmarks(rotation, translation);
        let image_points = POSE_LANDMARKS.map(|i| landmarks.point(i));

        let solved = solve_pnp(&image_points, &camera).unwrap();
        let angle = solved.rotation.rotation_to(&rotation).angle();
        assert!(angle < 1e-4, "rotation off by {} rad", angle);
        assert!((solved.translation - translation).norm() < 1e-2);
    }

    #[test]
    fn test_indicator_points_for_identity_pose() {
        let landmarks = projected_landmarks(Rotation3::identity(), Vector3::new(0.0, 0.0, 1000.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 4).unwrap();
        let f = CameraModel::for_image(WIDTH, HEIGHT).focal_length;
        // x axis endpoint (500, 0, 0) at depth 1000
        assert_eq!(pose.roll.pfn, [(320.0 + f * 0.5).round() as i64, 240]);
        assert_eq!(pose.pitch.pfn, [320, (240.0 + f * 0.5).round() as i64]);
        // z axis endpoint lies on the optical axis
        assert_eq!(pose.yaw.pfn, [320, 240]);
    }

    #[test]
    fn test_angles_are_rounded() {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.123456789);
        let landmarks = projected_landmarks(rotation, Vector3::new(0.0, 0.0, 1500.0));
        let pose = estimate_pose(&landmarks, WIDTH, HEIGHT, 2).unwrap();
        assert_eq!(pose.yaw.degrees, round_to(pose.yaw.degrees, 2));
        assert!((pose.yaw.degrees - 0.123456789f64.to_degrees()).abs() < 0.01);
    }

    #[test]
    fn test_rq_euler_axis_rotations() {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), 30f64.to_radians());
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), -25f64.to_radians());
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), 40f64.to_radians());

        let ex = rq_euler_degrees(rx.matrix());
        let ey = rq_euler_degrees(ry.matrix());
        let ez = rq_euler_degrees(rz.matrix());

        assert!((ex.x - 30.0).abs() < 1e-6 && ex.y.abs() < 1e-6 && ex.z.abs() < 1e-6);
        assert!((ey.y + 25.0).abs() < 1e-6 && ey.x.abs() < 1e-6 && ey.z.abs() < 1e-6);
        assert!((ez.z - 40.0).abs() < 1e-6 && ez.x.abs() < 1e-6 && ez.y.abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_landmarks_rejected() {
        let camera = CameraModel::for_image(WIDTH, HEIGHT);
        let mut points = [Point2D::new(100.0, 100.0); 6];
        points[2] = Point2D::new(f64::NAN, 1.0);
        assert!(matches!(
            solve_pnp(&points, &camera),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_collapsed_landmarks_fail_to_solve() {
        let landmarks = LandmarkSet::new(vec![Point2D::new(300.0, 200.0); 68]).unwrap();
        assert!(matches!(
            estimate_pose(&landmarks, WIDTH, HEIGHT, 4),
            Err(AnalysisError::PoseEstimationFailed(_))
        ));
    }

    #[test]
    fn test_pose_serializes_with_pfn_key() {
        let axis = AxisPose {
            degrees: 1.5,
            pfn: [10, 20],
        };
        let json = serde_json::to_value(axis).unwrap();
        assert_eq!(json["Degrees"], 1.5);
        assert_eq!(json["PFN"][1], 20);
    }
}
