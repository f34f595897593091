//! Area, aspect-ratio and rounding measurements

use crate::error::GeometryError;
use crate::point::{euclidean_distance, Point2D};

/// Number of contour points per eye in the 68-point layout
pub const EYE_POINT_COUNT: usize = 6;

/// Absolute area of the implicitly closed polygon through `points`.
///
/// Shoelace formula; the last vertex wraps to the first. Orientation does not
/// matter. Fewer than three vertices is rejected.
pub fn polygon_area(points: &[Point2D]) -> Result<f64, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::InvalidInput(format!(
            "polygon needs at least 3 points, got {}",
            points.len()
        )));
    }

    let n = points.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x * points[j].y;
        twice_area -= points[j].x * points[i].y;
    }

    Ok(twice_area.abs() / 2.0)
}

/// Eye aspect ratio over the canonical six-point eye contour.
///
/// Corners sit at 0 and 3, the upper lid at 1 and 2, the lower lid at 5 and 4:
///
/// `EAR = (|p1 - p5| + |p2 - p4|) / (2 |p0 - p3|)`
pub fn eye_aspect_ratio(eye: &[Point2D]) -> Result<f64, GeometryError> {
    if eye.len() != EYE_POINT_COUNT {
        return Err(GeometryError::InvalidInput(format!(
            "eye aspect ratio needs exactly {} points, got {}",
            EYE_POINT_COUNT,
            eye.len()
        )));
    }

    let vertical_a = euclidean_distance(eye[1], eye[5]);
    let vertical_b = euclidean_distance(eye[2], eye[4]);
    let horizontal = euclidean_distance(eye[0], eye[3]);

    if horizontal == 0.0 {
        return Err(GeometryError::DegenerateGeometry(
            "eye corners coincide".to_string(),
        ));
    }

    Ok((vertical_a + vertical_b) / (2.0 * horizontal))
}

/// Most decimal places an f64 can carry meaningfully
pub const MAX_DECIMALS: u32 = 15;

/// Round to `decimals` places, ties to even. Precision is capped at
/// [`MAX_DECIMALS`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(side: f64) -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(side, 0.0),
            Point2D::new(side, side),
            Point2D::new(0.0, side),
        ]
    }

    #[test]
    fn test_square_area() {
        assert!((polygon_area(&square(10.0)).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_area() {
        let tri = [
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(0.0, 3.0),
        ];
        assert!((polygon_area(&tri).unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_rejects_short_input() {
        let line = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)];
        assert!(matches!(
            polygon_area(&line),
            Err(GeometryError::InvalidInput(_))
        ));
        assert!(polygon_area(&[]).is_err());
    }

    #[test]
    fn test_collinear_area_is_zero() {
        let pts = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        ];
        assert_eq!(polygon_area(&pts).unwrap(), 0.0);
    }

    #[test]
    fn test_open_eye_ear() {
        // width 4, both lid gaps 2 -> (2 + 2) / 8
        let eye = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, -1.0),
            Point2D::new(3.0, -1.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(3.0, 1.0),
            Point2D::new(1.0, 1.0),
        ];
        assert!((eye_aspect_ratio(&eye).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_closed_eye_ear_is_zero() {
        let eye = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(3.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(3.0, 0.0),
            Point2D::new(1.0, 0.0),
        ];
        assert_eq!(eye_aspect_ratio(&eye).unwrap(), 0.0);
    }

    #[test]
    fn test_ear_rejects_wrong_count() {
        let five = vec![Point2D::new(0.0, 0.0); 5];
        let seven = vec![Point2D::new(0.0, 0.0); 7];
        assert!(matches!(
            eye_aspect_ratio(&five),
            Err(GeometryError::InvalidInput(_))
        ));
        assert!(matches!(
            eye_aspect_ratio(&seven),
            Err(GeometryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ear_degenerate_width() {
        let eye = vec![Point2D::new(5.0, 5.0); 6];
        assert!(matches!(
            eye_aspect_ratio(&eye),
            Err(GeometryError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(42.857142857, 4), 42.8571);
        assert_eq!(round_to(0.30004, 2), 0.3);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(-1.23456, 3), -1.235);
    }

    #[test]
    fn test_round_to_caps_precision() {
        assert_eq!(round_to(1.5, 400), 1.5);
        assert_eq!(round_to(0.1234, u32::MAX), 0.1234);
        assert!(round_to(123.456, 40).is_finite());
    }

    fn polygon_strategy() -> impl Strategy<Value = Vec<Point2D>> {
        prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 3..16)
            .prop_map(|pts| pts.into_iter().map(Point2D::from).collect())
    }

    proptest! {
        #[test]
        fn prop_area_non_negative(poly in polygon_strategy()) {
            prop_assert!(polygon_area(&poly).unwrap() >= 0.0);
        }

        #[test]
        fn prop_area_invariant_under_rotation(poly in polygon_strategy(), shift in 0usize..16) {
            let mut rotated = poly.clone();
            let k = shift % rotated.len();
            rotated.rotate_left(k);
            let a = polygon_area(&poly).unwrap();
            let b = polygon_area(&rotated).unwrap();
            prop_assert!((a - b).abs() <= 1e-6 * a.max(1.0));
        }

        #[test]
        fn prop_area_invariant_under_reversal(poly in polygon_strategy()) {
            let mut reversed = poly.clone();
            reversed.reverse();
            let a = polygon_area(&poly).unwrap();
            let b = polygon_area(&reversed).unwrap();
            prop_assert!((a - b).abs() <= 1e-6 * a.max(1.0));
        }
    }
}
