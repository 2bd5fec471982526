use std::path::{Path, PathBuf};
use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    /// A keypoint counts only when its confidence is strictly above this value.
    pub confidence_threshold: f64,
    /// How many of the four torso keypoints must survive aggregation.
    pub min_torso_landmarks: usize,
}

impl AggregationConfig {
    pub fn new() -> Self {
        AggregationConfig {
            confidence_threshold: 0.5,
            min_torso_landmarks: 3,
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Every `frame_stride`-th decoded frame is sent to the detector.
    pub frame_stride: u64,
    /// Sampling stops once this many frames produced a detection.
    pub max_accepted_frames: usize,
}

impl SamplingConfig {
    pub fn new() -> Self {
        SamplingConfig {
            frame_stride: 30,
            max_accepted_frames: 50,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub quality: i32,
    pub dir: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub draw_landmarks: bool,
}

impl ThumbnailConfig {
    pub fn new() -> Self {
        ThumbnailConfig {
            quality: 85,
            dir: PathBuf::from("static/thumbnails"),
            max_width: 400,
            max_height: 600,
            draw_landmarks: true,
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
    pub max_videos: usize,
}

impl UploadConfig {
    pub fn new() -> Self {
        UploadConfig {
            dir: PathBuf::from("uploads"),
            max_file_size: 100 * 1024 * 1024,
            allowed_extensions: vec![".mp4".to_string(), ".mov".to_string(), ".avi".to_string(), ".mkv".to_string()],
            max_videos: 4,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Mock,
    Onnx,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    pub model_path: PathBuf,
    /// Side of the square network input, in pixels.
    pub input_size: i32,
    /// Frames whose best keypoint score stays below this value count as "no person".
    pub min_pose_score: f32,
}

impl DetectorConfig {
    pub fn new() -> Self {
        DetectorConfig {
            kind: DetectorKind::Mock,
            model_path: PathBuf::from("models/movenet_singlepose_lightning.onnx"),
            input_size: 192,
            min_pose_score: 0.2,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only settings shared by every video of every batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub aggregation: AggregationConfig,
    pub sampling: SamplingConfig,
    pub thumbnail: ThumbnailConfig,
    pub upload: UploadConfig,
    pub detector: DetectorConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        PipelineConfig::default()
    }

    /// from_json_file loads a configuration; absent fields keep their defaults.
    ///
    /// # Arguments
    /// * `path` - path of a JSON document
    ///
    /// # Returns
    /// * `Result<PipelineConfig, Error>`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }
}
