use anyhow::Error;
use ndarray::ArrayView2;
use crate::config::config::{DetectorConfig, DetectorKind};
use crate::utils::coordinate::{Keypoint, KeypointName, Skeleton};
use crate::utils::image::Frame;

/// Keypoint detection capability consumed by the pipeline.
///
/// Implementations may keep native resources; the pipeline owns a detector
/// exclusively and calls it from one task at a time.
pub trait KeypointDetector: Send {
    /// detect returns the keypoints of the person in `frame`, or `None` if nobody was found.
    fn detect(&mut self, frame: &Frame) -> Result<Option<Skeleton>, Error>;

    fn name(&self) -> &'static str;
}

/// standing_pose is a plausible front-facing standing posture.
pub fn standing_pose() -> Skeleton {
    let points = [
        (KeypointName::Nose, 0.5, 0.15, 0.9),
        (KeypointName::LeftEye, 0.48, 0.14, 0.9),
        (KeypointName::RightEye, 0.52, 0.14, 0.9),
        (KeypointName::LeftEar, 0.45, 0.15, 0.8),
        (KeypointName::RightEar, 0.55, 0.15, 0.8),
        (KeypointName::LeftShoulder, 0.42, 0.25, 0.9),
        (KeypointName::RightShoulder, 0.58, 0.25, 0.9),
        (KeypointName::LeftElbow, 0.35, 0.35, 0.8),
        (KeypointName::RightElbow, 0.65, 0.35, 0.8),
        (KeypointName::LeftWrist, 0.30, 0.45, 0.7),
        (KeypointName::RightWrist, 0.70, 0.45, 0.7),
        (KeypointName::LeftHip, 0.45, 0.50, 0.9),
        (KeypointName::RightHip, 0.55, 0.50, 0.9),
        (KeypointName::LeftKnee, 0.47, 0.70, 0.8),
        (KeypointName::RightKnee, 0.53, 0.70, 0.8),
        (KeypointName::LeftAnkle, 0.48, 0.90, 0.7),
        (KeypointName::RightAnkle, 0.52, 0.90, 0.7),
    ];
    points
        .iter()
        .fold(Skeleton::new(), |skeleton, &(name, x, y, c)| skeleton.with(name, Keypoint::new(x, y, c)))
}

/// Deterministic detector returning the same skeleton for every frame.
#[derive(Debug, Clone)]
pub struct MockPoseDetector {
    skeleton: Option<Skeleton>,
}

impl MockPoseDetector {
    pub fn new() -> Self {
        MockPoseDetector { skeleton: Some(standing_pose()) }
    }

    /// with_skeleton answers every frame with `skeleton`; `None` simulates an empty scene.
    pub fn with_skeleton(skeleton: Option<Skeleton>) -> Self {
        MockPoseDetector { skeleton }
    }
}

impl Default for MockPoseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeypointDetector for MockPoseDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Option<Skeleton>, Error> {
        Ok(self.skeleton)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// skeleton_from_movenet decodes a single-pose MoveNet output tensor.
///
/// The tensor holds 17 rows of `(y, x, score)` in normalized coordinates,
/// ordered like `KeypointName`. Coordinates are clamped into the frame.
///
/// # Arguments
/// * `output` - flattened `[1, 1, 17, 3]` tensor
/// * `min_pose_score` - best keypoint score under which the frame has no person
///
/// # Returns
/// * `Result<Option<Skeleton>, Error>`
pub fn skeleton_from_movenet(output: &[f32], min_pose_score: f32) -> Result<Option<Skeleton>, Error> {
    let rows = ArrayView2::from_shape((KeypointName::COUNT, 3), output)?;

    let best_score = rows.column(2).iter().cloned().fold(f32::MIN, f32::max);
    if best_score < min_pose_score {
        return Ok(None);
    }

    let mut skeleton = Skeleton::new();
    for (index, row) in rows.outer_iter().enumerate() {
        let Some(name) = KeypointName::from_index(index) else { continue };
        let y = (row[0] as f64).clamp(0.0, 1.0);
        let x = (row[1] as f64).clamp(0.0, 1.0);
        let score = (row[2] as f64).clamp(0.0, 1.0);
        skeleton.set(name, Some(Keypoint::new(x, y, score)));
    }
    Ok(Some(skeleton))
}

/// create_detector builds the detector chosen in the configuration.
pub fn create_detector(config: &DetectorConfig) -> Result<Box<dyn KeypointDetector>, Error> {
    match config.kind {
        DetectorKind::Mock => Ok(Box::new(MockPoseDetector::new())),
        #[cfg(feature = "opencv")]
        DetectorKind::Onnx => Ok(Box::new(onnx::OnnxPoseDetector::new(config)?)),
        #[cfg(not(feature = "opencv"))]
        DetectorKind::Onnx => Err(Error::msg("the onnx detector requires the `opencv` feature")),
    }
}

#[cfg(feature = "opencv")]
pub use self::onnx::OnnxPoseDetector;

#[cfg(feature = "opencv")]
mod onnx {
    use anyhow::Error;
    use opencv::core::{Mat, Scalar, Size, CV_32F};
    use opencv::dnn::{self, Net};
    use opencv::prelude::*;
    use tracing::info;
    use crate::config::config::DetectorConfig;
    use crate::modules::pose_detector::{skeleton_from_movenet, KeypointDetector};
    use crate::utils::coordinate::Skeleton;
    use crate::utils::image::{frame_to_mat, Frame};

    /// MoveNet single-pose detector running an NCHW float ONNX export through OpenCV DNN.
    pub struct OnnxPoseDetector {
        net: Net,
        input_size: i32,
        min_pose_score: f32,
    }

    impl OnnxPoseDetector {
        pub fn new(config: &DetectorConfig) -> Result<Self, Error> {
            let model_path = config.model_path.to_string_lossy();
            let net = dnn::read_net_from_onnx(&model_path)?;
            if net.empty()? {
                return Err(Error::msg(format!("pose model {model_path} could not be loaded")));
            }
            info!(model = %model_path, input_size = config.input_size, "loaded pose model");
            Ok(OnnxPoseDetector {
                net,
                input_size: config.input_size,
                min_pose_score: config.min_pose_score,
            })
        }

        fn preprocess(&self, frame: &Frame) -> Result<Mat, Error> {
            let image = frame_to_mat(frame)?;
            let blob = dnn::blob_from_image(
                &image,
                1.0,
                Size::new(self.input_size, self.input_size),
                Scalar::default(),
                true,
                false,
                CV_32F,
            )?;
            Ok(blob)
        }
    }

    impl KeypointDetector for OnnxPoseDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Option<Skeleton>, Error> {
            if frame.is_empty() {
                return Ok(None);
            }
            let blob = self.preprocess(frame)?;
            self.net.set_input(&blob, "", 1.0, Scalar::default())?;
            let output = self.net.forward_single("")?;
            skeleton_from_movenet(output.data_typed::<f32>()?, self.min_pose_score)
        }

        fn name(&self) -> &'static str {
            "onnx"
        }
    }
}
