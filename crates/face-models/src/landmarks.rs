//! ONNX 68-point landmark regressor
//!
//! The network takes a `1x3x128x128` crop of the face box (gray replicated
//! to three channels, scaled to `0..1`) and returns 136 values: the x and y
//! of each landmark, normalised to the crop.

use std::path::Path;

use face_analysis::{AnalysisError, BoundingBox, LandmarkPredictor, LandmarkSet, LANDMARK_COUNT};
use face_geometry::Point2D;
use image::imageops::FilterType;
use image_input::GrayFrame;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::{load_error, ModelError};

/// Side of the square network input
pub const LANDMARK_INPUT_SIZE: usize = 128;

type Plan = TypedRunnableModel<TypedModel>;

/// Region of the image fed to the network, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// Face box clipped to the image, `None` when nothing is left
    pub fn clip(face: &BoundingBox, image_width: u32, image_height: u32) -> Option<Self> {
        let left = face.left.clamp(0, image_width as i64);
        let top = face.top.clamp(0, image_height as i64);
        let right = face.right().clamp(0, image_width as i64);
        let bottom = face.bottom().clamp(0, image_height as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

/// Landmark predictor running an ONNX model with `tract`
pub struct OnnxLandmarkPredictor {
    plan: Plan,
}

impl OnnxLandmarkPredictor {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        info!("Loading landmark model from {}", path.display());
        let size = LANDMARK_INPUT_SIZE;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| load_error(path, e))?;
        Ok(Self { plan })
    }

    fn input_tensor(gray: &GrayFrame, crop: CropRegion) -> Result<Tensor, AnalysisError> {
        let buffer = image::GrayImage::from_raw(gray.width, gray.height, gray.data.clone())
            .ok_or_else(|| AnalysisError::Landmarking("gray frame size mismatch".to_string()))?;
        let face =
            image::imageops::crop_imm(&buffer, crop.x, crop.y, crop.width, crop.height).to_image();
        let size = LANDMARK_INPUT_SIZE as u32;
        let resized = image::imageops::resize(&face, size, size, FilterType::Triangle);

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE),
            |(_, _, y, x)| resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0,
        );
        Ok(input.into())
    }
}

impl LandmarkPredictor for OnnxLandmarkPredictor {
    fn predict(&self, gray: &GrayFrame, face: &BoundingBox) -> Result<LandmarkSet, AnalysisError> {
        let crop = CropRegion::clip(face, gray.width, gray.height).ok_or_else(|| {
            AnalysisError::Landmarking(format!("face box {:?} lies outside the image", face))
        })?;
        let input = Self::input_tensor(gray, crop)?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| AnalysisError::Landmarking(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| AnalysisError::Landmarking("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| AnalysisError::Landmarking(e.to_string()))?;
        let values: Vec<f32> = view.iter().copied().collect();
        debug!(outputs = values.len(), "Landmark inference");

        landmarks_from_output(&values, crop)
    }
}

/// Map normalised `[x0, y0, x1, y1, ...]` network output back to whole image
/// pixels
pub fn landmarks_from_output(
    values: &[f32],
    crop: CropRegion,
) -> Result<LandmarkSet, AnalysisError> {
    if values.len() != LANDMARK_COUNT * 2 {
        return Err(AnalysisError::Landmarking(format!(
            "expected {} output values, got {}",
            LANDMARK_COUNT * 2,
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::Landmarking("non-finite landmark output".to_string()));
    }

    let points = values
        .chunks_exact(2)
        .map(|xy| {
            Point2D::new(
                crop.x as f64 + xy[0] as f64 * crop.width as f64,
                crop.y as f64 + xy[1] as f64 * crop.height as f64,
            )
            .rounded()
        })
        .collect();
    LandmarkSet::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn crop() -> CropRegion {
        CropRegion {
            x: 100,
            y: 50,
            width: 200,
            height: 100,
        }
    }

    #[test]
    fn test_clip_inside() {
        let face = BoundingBox::new(10, 20, 30, 40).unwrap();
        assert_eq!(
            CropRegion::clip(&face, 100, 100),
            Some(CropRegion {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            })
        );
    }

    #[test]
    fn test_clip_overhanging_box() {
        let face = BoundingBox::new(-10, 80, 50, 50).unwrap();
        let c = CropRegion::clip(&face, 100, 100).unwrap();
        assert_eq!((c.x, c.y, c.width, c.height), (0, 80, 40, 20));
    }

    #[test]
    fn test_clip_outside_is_none() {
        let face = BoundingBox::new(150, 10, 20, 20).unwrap();
        assert_eq!(CropRegion::clip(&face, 100, 100), None);
    }

    #[test]
    fn test_output_maps_to_pixels() {
        let mut values = vec![0.0f32; 136];
        values[0] = 0.5;
        values[1] = 0.5;
        values[60] = 1.0;
        values[61] = 0.25;
        let set = landmarks_from_output(&values, crop()).unwrap();
        assert_eq!(set.point(0), Point2D::new(200.0, 100.0));
        assert_eq!(set.point(30), Point2D::new(300.0, 75.0));
        assert_eq!(set.point(67), Point2D::new(100.0, 50.0));
    }

    #[test]
    fn test_output_rounds_to_whole_pixels() {
        let mut values = vec![0.0f32; 136];
        values[0] = 0.0123;
        let set = landmarks_from_output(&values, crop()).unwrap();
        // 100 + 2.46
        assert_eq!(set.point(0).x, 102.0);
    }

    #[test]
    fn test_output_length_checked() {
        assert!(landmarks_from_output(&[0.0; 162], crop()).is_err());
        assert!(landmarks_from_output(&[], crop()).is_err());
    }

    #[test]
    fn test_nan_output_rejected() {
        let mut values = vec![0.0f32; 136];
        values[5] = f32::NAN;
        assert!(matches!(
            landmarks_from_output(&values, crop()),
            Err(AnalysisError::Landmarking(_))
        ));
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxLandmarkPredictor::from_path(Path::new("/nonexistent/landmarks.onnx"));
        assert!(matches!(result, Err(ModelError::ModelLoad { .. })));
    }

    proptest! {
        #[test]
        fn prop_points_stay_inside_crop(values in proptest::collection::vec(0.0f32..=1.0, 136)) {
            let c = crop();
            let set = landmarks_from_output(&values, c).unwrap();
            for p in set.points() {
                prop_assert!(p.x >= c.x as f64 && p.x <= (c.x + c.width) as f64);
                prop_assert!(p.y >= c.y as f64 && p.y <= (c.y + c.height) as f64);
            }
        }
    }
}
