//! Face Geometry
//!
//! Precision-agnostic planar geometry over facial landmark coordinates:
//! - Polygon area (shoelace formula)
//! - Euclidean distance
//! - Eye aspect ratio (EAR)
//! - Line fitting and point reflection for the head-top estimate
//!
//! Rounding is a presentation concern and lives in [`round_to`]; none of the
//! measurements here round their results.

mod error;
mod line;
mod measure;
mod point;

pub use error::GeometryError;
pub use line::{estimate_top_of_head, fit_line, reflect_point_across_line, Line};
pub use measure::{eye_aspect_ratio, polygon_area, round_to, EYE_POINT_COUNT, MAX_DECIMALS};
pub use point::{euclidean_distance, Point2D};
