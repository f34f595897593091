//! Geometry Error Types

use thiserror::Error;

/// Errors raised by the geometry helpers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Wrong number of points or otherwise malformed arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Arguments are well-formed but the measurement is undefined for them
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
}
