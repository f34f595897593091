//! Face quality report
//!
//! Fields are declared in key order so serialized payloads come out with
//! sorted keys.

use serde::{Deserialize, Serialize};

use crate::landmarks::{BoundingBox, LandmarkSet, NamedLandmarks};
use crate::pose::PoseEstimate;
use crate::scoring::{EyeState, MouthState};

/// Everything measured on the single accepted face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceDetails {
    pub bounding_box: BoundingBox,
    pub eye_distance: i64,
    pub eyes_closed: EyeState,
    pub full_facial_landmarks: LandmarkSet,
    pub landmarks: NamedLandmarks,
    pub mouth_open: MouthState,
    pub pose: PoseEstimate,
}

/// Result of analysing one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceReport {
    /// Present only when `success` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_details: Option<FaceDetails>,
    pub faces_count: usize,
    pub file_name: String,
    /// Empty on success, otherwise why the image is unusable
    pub reason: String,
    pub success: bool,
    /// Wall-clock seconds spent on the request
    #[serde(with = "seconds")]
    pub time_elapsed: f64,
}

impl FaceReport {
    /// Report for an image that failed the face-count or containment gate
    pub fn unsuccessful(
        file_name: impl Into<String>,
        faces_count: usize,
        reason: impl Into<String>,
        time_elapsed: f64,
    ) -> Self {
        Self {
            face_details: None,
            faces_count,
            file_name: file_name.into(),
            reason: reason.into(),
            success: false,
            time_elapsed,
        }
    }

    /// Report for an image with exactly one contained face
    pub fn successful(
        file_name: impl Into<String>,
        details: FaceDetails,
        time_elapsed: f64,
    ) -> Self {
        Self {
            face_details: Some(details),
            faces_count: 1,
            file_name: file_name.into(),
            reason: String::new(),
            success: true,
            time_elapsed,
        }
    }
}

/// `TimeElapsed` travels as `"<seconds> seconds"`
mod seconds {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const SUFFIX: &str = " seconds";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}{}", value, SUFFIX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_suffix(SUFFIX)
            .unwrap_or(&raw)
            .trim()
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid elapsed time {:?}: {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::AxisPose;
    use crate::scoring::EyeStatus;
    use face_geometry::Point2D;

    fn details() -> FaceDetails {
        let points: Vec<Point2D> = (0..68)
            .map(|i| Point2D::new(200.0 + i as f64, 150.0 + (i % 7) as f64))
            .collect();
        let landmarks = LandmarkSet::new(points).unwrap();
        FaceDetails {
            bounding_box: BoundingBox::new(190, 140, 120, 130).unwrap(),
            eye_distance: 9,
            eyes_closed: EyeState {
                left_eye_area: 101.5,
                right_eye_area: 99.25,
                score: [0.2812, 0.3007],
                status: EyeStatus::Left,
            },
            mouth_open: MouthState {
                score: 12.3457,
                status: false,
            },
            pose: PoseEstimate {
                pitch: AxisPose {
                    degrees: -176.1234,
                    pfn: [320, 741],
                },
                roll: AxisPose {
                    degrees: 2.5,
                    pfn: [780, 236],
                },
                yaw: AxisPose {
                    degrees: -3.0001,
                    pfn: [301, 240],
                },
            },
            landmarks: landmarks.named(),
            full_facial_landmarks: landmarks,
        }
    }

    #[test]
    fn test_unsuccessful_report_omits_details() {
        let report = FaceReport::unsuccessful("a.jpg", 0, "no faces detected", 0.0123);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["Success"], false);
        assert_eq!(json["FacesCount"], 0);
        assert_eq!(json["Reason"], "no faces detected");
        assert_eq!(json["TimeElapsed"], "0.0123 seconds");
        assert!(json.get("FaceDetails").is_none());
    }

    #[test]
    fn test_keys_are_sorted() {
        let report = FaceReport::successful("face.png", details(), 0.5);
        let text = serde_json::to_string(&report).unwrap();
        let order = [
            "\"FaceDetails\"",
            "\"FacesCount\"",
            "\"FileName\"",
            "\"Reason\"",
            "\"Success\"",
            "\"TimeElapsed\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", text);

        let json = serde_json::to_value(&report).unwrap();
        let details = &json["FaceDetails"];
        assert_eq!(details["Landmarks"]["Nose"], serde_json::json!([230.0, 152.0]));
        assert!(details["Landmarks"].get("CheekLeft").is_none());
        assert_eq!(details["EyesClosed"]["Status"], "left");
        assert_eq!(details["Pose"]["Roll"]["PFN"], serde_json::json!([780, 236]));
        assert_eq!(details["FullFacialLandmarks"].as_array().unwrap().len(), 68);
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let report = FaceReport::successful("face.png", details(), 0.1234);
        let text = serde_json::to_string(&report).unwrap();
        let back: FaceReport = serde_json::from_str(&text).unwrap();

        assert_eq!(back, report);
    }

    #[test]
    fn test_elapsed_time_parse_rejects_garbage() {
        let text = r#"{"FacesCount":0,"FileName":"x","Reason":"","Success":false,
            "TimeElapsed":"soon"}"#;
        assert!(serde_json::from_str::<FaceReport>(text).is_err());
    }
}
