//! Image-space points

use serde::{Deserialize, Serialize};

/// A point in image pixel space.
///
/// Serializes as a two-element `[x, y]` array, the layout used by the report
/// payload for every landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Round both coordinates to the nearest whole pixel (ties to even)
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round_ties_even(),
            y: self.y.round_ties_even(),
        }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

/// Standard L2 distance between two points
pub fn euclidean_distance(a: Point2D, b: Point2D) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_345() {
        let d = euclidean_distance(Point2D::new(0.0, 0.0), Point2D::new(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Point2D::new(12.5, -3.0);
        let b = Point2D::new(-7.0, 40.25);
        assert_eq!(euclidean_distance(a, b), euclidean_distance(b, a));
        assert_eq!(euclidean_distance(a, a), 0.0);
    }

    #[test]
    fn test_rounded_ties_to_even() {
        let p = Point2D::new(2.5, 3.5).rounded();
        assert_eq!(p, Point2D::new(2.0, 4.0));
    }
}
