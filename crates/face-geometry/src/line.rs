//! Lines through two landmarks and reflections across them
//!
//! Only used for the auxiliary head-top estimate: the chin is mirrored across
//! the line joining the outer eye corners.

use crate::error::GeometryError;
use crate::point::Point2D;

/// A line in the image plane.
///
/// Slope-intercept form cannot represent a vertical line, so that case is
/// carried separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Line {
    /// `y = slope * x + intercept`
    Sloped { slope: f64, intercept: f64 },
    /// `x = x`
    Vertical { x: f64 },
}

/// Least-squares line through two points, i.e. the unique line through both.
pub fn fit_line(p1: Point2D, p2: Point2D) -> Result<Line, GeometryError> {
    if p1 == p2 {
        return Err(GeometryError::DegenerateGeometry(
            "cannot fit a line through a single point".to_string(),
        ));
    }

    if p1.x == p2.x {
        return Ok(Line::Vertical { x: p1.x });
    }

    let slope = (p2.y - p1.y) / (p2.x - p1.x);
    let intercept = p1.y - slope * p1.x;
    Ok(Line::Sloped { slope, intercept })
}

/// Mirror `point` across `line`.
pub fn reflect_point_across_line(point: Point2D, line: &Line) -> Point2D {
    match *line {
        Line::Sloped { slope: m, intercept: c } => {
            let d = (point.x + (point.y - c) * m) / (1.0 + m * m);
            Point2D::new(2.0 * d - point.x, 2.0 * d * m - point.y + 2.0 * c)
        }
        Line::Vertical { x } => Point2D::new(2.0 * x - point.x, point.y),
    }
}

/// Estimate the top of the head by reflecting the chin tip across the line
/// through the outer eye corners. Coordinates are truncated to whole pixels.
pub fn estimate_top_of_head(
    left_eye_left: Point2D,
    right_eye_right: Point2D,
    chin_tip: Point2D,
) -> Result<Point2D, GeometryError> {
    let eye_line = fit_line(left_eye_left, right_eye_right)?;
    let top = reflect_point_across_line(chin_tip, &eye_line);
    Ok(Point2D::new(top.x.trunc(), top.y.trunc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_horizontal_line() {
        let line = fit_line(Point2D::new(0.0, 5.0), Point2D::new(10.0, 5.0)).unwrap();
        assert_eq!(line, Line::Sloped { slope: 0.0, intercept: 5.0 });
    }

    #[test]
    fn test_fit_diagonal_line() {
        match fit_line(Point2D::new(1.0, 3.0), Point2D::new(3.0, 7.0)).unwrap() {
            Line::Sloped { slope, intercept } => {
                assert!((slope - 2.0).abs() < 1e-12);
                assert!((intercept - 1.0).abs() < 1e-12);
            }
            other => panic!("expected sloped line, got {:?}", other),
        }
    }

    #[test]
    fn test_fit_vertical_line() {
        let line = fit_line(Point2D::new(4.0, 0.0), Point2D::new(4.0, 9.0)).unwrap();
        assert_eq!(line, Line::Vertical { x: 4.0 });
    }

    #[test]
    fn test_fit_coincident_points() {
        let p = Point2D::new(1.0, 1.0);
        assert!(matches!(
            fit_line(p, p),
            Err(GeometryError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_reflect_across_horizontal() {
        let line = Line::Sloped { slope: 0.0, intercept: 10.0 };
        let r = reflect_point_across_line(Point2D::new(3.0, 25.0), &line);
        assert!((r.x - 3.0).abs() < 1e-12);
        assert!((r.y + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_across_diagonal() {
        let line = Line::Sloped { slope: 1.0, intercept: 0.0 };
        let r = reflect_point_across_line(Point2D::new(2.0, 0.0), &line);
        assert!((r.x - 0.0).abs() < 1e-12);
        assert!((r.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_reflect_across_vertical() {
        let r = reflect_point_across_line(Point2D::new(1.0, 7.0), &Line::Vertical { x: 4.0 });
        assert_eq!(r, Point2D::new(7.0, 7.0));
    }

    #[test]
    fn test_reflection_is_involution() {
        let line = Line::Sloped { slope: -0.35, intercept: 120.0 };
        let p = Point2D::new(210.0, 380.0);
        let back = reflect_point_across_line(reflect_point_across_line(p, &line), &line);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_head_top_upright_face() {
        // eyes level at y = 200, chin 150px below -> head top 150px above
        let top = estimate_top_of_head(
            Point2D::new(150.0, 200.0),
            Point2D::new(250.0, 200.0),
            Point2D::new(200.0, 350.0),
        )
        .unwrap();
        assert_eq!(top, Point2D::new(200.0, 50.0));
    }
}
