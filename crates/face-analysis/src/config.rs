//! Analysis configuration

use serde::{Deserialize, Serialize};

/// Tunables of the report pipeline, fixed at process start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Decimal places kept for angles, scores, areas and elapsed time
    pub decimal_precision: u32,

    /// Eye aspect ratio below which an eye counts as closed
    pub eyes_closed_threshold: f64,

    /// Mouth-open score (percent) above which the mouth counts as open
    pub mouth_open_threshold: f64,

    /// Upsample the gray image 2x before face detection (slower, finds smaller faces)
    pub upsample: bool,

    /// Log per-stage timings at debug level
    pub timing: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            decimal_precision: 4,
            eyes_closed_threshold: 0.3,
            mouth_open_threshold: 20.0,
            upsample: false,
            timing: false,
        }
    }
}

impl AnalysisConfig {
    /// Create strict config (flags eyes as closed sooner, mouth as open sooner)
    pub fn strict() -> Self {
        Self {
            eyes_closed_threshold: 0.33,
            mouth_open_threshold: 10.0,
            ..Default::default()
        }
    }

    /// Create lenient config (tolerates narrower eyes and a slightly parted mouth)
    pub fn lenient() -> Self {
        Self {
            eyes_closed_threshold: 0.25,
            mouth_open_threshold: 30.0,
            ..Default::default()
        }
    }
}
