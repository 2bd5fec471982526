use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::errors::PostureError;

/// Camera position a video was recorded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoAngle {
    Front,
    Left,
    Right,
    Back,
}

impl VideoAngle {
    pub const ALL: [VideoAngle; 4] = [VideoAngle::Front, VideoAngle::Left, VideoAngle::Right, VideoAngle::Back];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAngle::Front => "front",
            VideoAngle::Left => "left",
            VideoAngle::Right => "right",
            VideoAngle::Back => "back",
        }
    }
}

impl fmt::Display for VideoAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoAngle {
    type Err = PostureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(VideoAngle::Front),
            "left" => Ok(VideoAngle::Left),
            "right" => Ok(VideoAngle::Right),
            "back" => Ok(VideoAngle::Back),
            other => Err(PostureError::InvalidRequest(format!(
                "Invalid angle: {other}. Must be one of: front, left, right, back"
            ))),
        }
    }
}

/// Optional attributes of the person being recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Height in centimetres.
    pub height_cm: Option<f64>,
    /// Weight in kilograms.
    pub weight_kg: Option<f64>,
    pub age: Option<u32>,
    /// Distance between camera and subject in metres.
    pub camera_distance_m: Option<f64>,
}

impl UserMetadata {
    /// validate checks every provided attribute against its accepted range.
    pub fn validate(&self) -> Result<(), PostureError> {
        check_range("height_cm", self.height_cm, 50.0, 250.0)?;
        check_range("weight_kg", self.weight_kg, 20.0, 300.0)?;
        check_range("age", self.age.map(f64::from), 1.0, 120.0)?;
        check_range("camera_distance_m", self.camera_distance_m, 0.5, 10.0)
    }
}

fn check_range(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), PostureError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(PostureError::InvalidMetadata(format!(
            "{name} must be between {min} and {max}, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// One uploaded video file.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        VideoUpload {
            file_name: file_name.into(),
            content,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A multi-view analysis request: one declared angle per video, in the same order.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub videos: Vec<VideoUpload>,
    /// Raw angle tokens as received; parsed during validation.
    pub angles: Vec<String>,
    pub user: UserMetadata,
}

impl AnalysisRequest {
    /// from_angle_list builds a request from a comma separated angle list such as `"front,left"`.
    ///
    /// # Arguments
    ///
    /// * `videos` - uploaded videos, in capture order
    /// * `angles` - comma separated angle tokens, one per video
    /// * `user` - optional user attributes
    pub fn from_angle_list(videos: Vec<VideoUpload>, angles: &str, user: UserMetadata) -> Self {
        AnalysisRequest {
            videos,
            angles: angles.split(',').map(|a| a.trim().to_string()).collect(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::PostureError;
    use crate::pipeline::request::{AnalysisRequest, UserMetadata, VideoAngle, VideoUpload};

    #[test]
    fn test_parse_angles() {
        for angle in VideoAngle::ALL {
            assert_eq!(angle.as_str().parse::<VideoAngle>().unwrap(), angle);
        }
        assert!(matches!("top".parse::<VideoAngle>(), Err(PostureError::InvalidRequest(_))));
        assert!("Front".parse::<VideoAngle>().is_err());
    }

    #[test]
    fn test_angle_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&VideoAngle::Back).unwrap(), "\"back\"");
    }

    #[test]
    fn test_user_metadata_ranges() {
        assert!(UserMetadata::default().validate().is_ok());

        let valid = UserMetadata {
            height_cm: Some(250.0),
            weight_kg: Some(20.0),
            age: Some(1),
            camera_distance_m: Some(0.5),
        };
        assert!(valid.validate().is_ok());

        let too_close = UserMetadata { camera_distance_m: Some(0.4), ..valid };
        assert!(matches!(too_close.validate(), Err(PostureError::InvalidMetadata(_))));

        let too_old = UserMetadata { age: Some(121), ..valid };
        assert!(too_old.validate().is_err());

        let too_short = UserMetadata { height_cm: Some(49.9), ..valid };
        assert!(too_short.validate().is_err());
    }

    #[test]
    fn test_from_angle_list_trims_tokens() {
        let videos = vec![VideoUpload::new("a.mp4", vec![1]), VideoUpload::new("b.mp4", vec![2])];
        let request = AnalysisRequest::from_angle_list(videos, "front, left", UserMetadata::default());
        assert_eq!(request.angles, vec!["front", "left"]);
        assert_eq!(request.videos[1].size(), 1);
    }
}
