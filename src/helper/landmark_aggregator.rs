use nalgebra::Vector3;
use tracing::debug;
use crate::config::config::AggregationConfig;
use crate::utils::coordinate::{Keypoint, KeypointName, Skeleton};

/// Reduces per-frame detections of one video to a single representative skeleton.
#[derive(Debug, Clone)]
pub struct LandmarkAggregator {
    confidence_threshold: f64,
    min_torso_landmarks: usize,
}

impl LandmarkAggregator {

    /// new initializes an aggregator with the acceptance threshold and the gate size.
    pub fn new(config: &AggregationConfig) -> Self {
        LandmarkAggregator {
            confidence_threshold: config.confidence_threshold,
            min_torso_landmarks: config.min_torso_landmarks,
        }
    }

    /// aggregate averages every slot over the frames where it was detected confidently.
    ///
    /// A sample qualifies when its confidence is present and strictly above the
    /// threshold. Qualifying samples are combined with an unweighted mean of
    /// x, y and confidence; a slot without any qualifying sample stays absent.
    ///
    /// # Arguments
    /// * `frames` - one skeleton per sampled frame, in any order
    ///
    /// # Returns
    /// * `Skeleton`
    pub fn aggregate(&self, frames: &[Skeleton]) -> Skeleton {
        let mut result = Skeleton::new();
        for name in KeypointName::ALL {
            let samples = frames
                .iter()
                .filter_map(|frame| frame.get(name))
                .filter(|keypoint| keypoint.is_confident(self.confidence_threshold));
            result.set(name, mean_keypoint(samples));
        }
        debug!(frames = frames.len(), present = result.present_count(), "aggregated landmarks");
        result
    }

    /// validate_detection tells whether enough of the torso survived aggregation.
    ///
    /// Counts the shoulders and hips that are present with a confidence above the
    /// threshold and accepts the skeleton when at least `min_torso_landmarks` are.
    pub fn validate_detection(&self, skeleton: &Skeleton) -> bool {
        self.torso_landmark_count(skeleton) >= self.min_torso_landmarks
    }

    pub fn torso_landmark_count(&self, skeleton: &Skeleton) -> usize {
        KeypointName::TORSO
            .iter()
            .filter_map(|&name| skeleton.get(name))
            .filter(|keypoint| keypoint.is_confident(self.confidence_threshold))
            .count()
    }
}

/// Incremental arithmetic mean of (x, y, confidence). Identical samples reproduce
/// themselves exactly, which a sum-then-divide mean does not guarantee.
fn mean_keypoint(samples: impl Iterator<Item = Keypoint>) -> Option<Keypoint> {
    let mut mean: Option<Vector3<f64>> = None;
    let mut count = 0usize;
    for keypoint in samples {
        let sample = Vector3::new(keypoint.x, keypoint.y, keypoint.confidence.unwrap_or(0.0));
        count += 1;
        mean = Some(match mean {
            None => sample,
            Some(current) => current + (sample - current) / count as f64,
        });
    }
    mean.map(|m| Keypoint::new(m.x, m.y, m.z))
}

#[cfg(test)]
mod tests {
    use crate::config::config::AggregationConfig;
    use crate::helper::landmark_aggregator::LandmarkAggregator;
    use crate::utils::coordinate::{Keypoint, KeypointName, Skeleton};

    fn aggregator() -> LandmarkAggregator {
        LandmarkAggregator::new(&AggregationConfig::new())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "{actual} != {expected}");
    }

    #[test]
    fn test_identical_frames_reproduce_the_sample_exactly() {
        let keypoint = Keypoint::new(0.1, 0.7, 0.9);
        let frames = vec![Skeleton::new().with(KeypointName::Nose, keypoint); 7];
        let result = aggregator().aggregate(&frames);
        assert_eq!(result.get(KeypointName::Nose), Some(keypoint));
        assert_eq!(result.present_count(), 1);
    }

    #[test]
    fn test_mean_over_qualifying_samples_only() {
        let frames = vec![
            Skeleton::new().with(KeypointName::LeftKnee, Keypoint::new(0.40, 0.70, 0.8)),
            Skeleton::new().with(KeypointName::LeftKnee, Keypoint::new(0.50, 0.60, 0.6)),
            // below the threshold: ignored
            Skeleton::new().with(KeypointName::LeftKnee, Keypoint::new(0.90, 0.10, 0.4)),
            // exactly at the threshold: ignored
            Skeleton::new().with(KeypointName::LeftKnee, Keypoint::new(0.90, 0.10, 0.5)),
            // no confidence: ignored
            Skeleton::new().with(KeypointName::LeftKnee, Keypoint::unscored(0.90, 0.10)),
            Skeleton::new(),
        ];
        let knee = aggregator().aggregate(&frames).get(KeypointName::LeftKnee).unwrap();
        assert_close(knee.x, 0.45);
        assert_close(knee.y, 0.65);
        assert_close(knee.confidence.unwrap(), 0.7);
    }

    #[test]
    fn test_slot_without_qualifying_samples_is_absent() {
        let frames = vec![
            Skeleton::new().with(KeypointName::RightWrist, Keypoint::new(0.7, 0.45, 0.3)),
            Skeleton::new().with(KeypointName::RightWrist, Keypoint::new(0.7, 0.45, 0.5)),
        ];
        let result = aggregator().aggregate(&frames);
        assert!(result.get(KeypointName::RightWrist).is_none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_aggregate_no_frames() {
        assert!(aggregator().aggregate(&[]).is_empty());
    }

    fn torso(count: usize) -> Skeleton {
        KeypointName::TORSO
            .iter()
            .take(count)
            .fold(Skeleton::new(), |skeleton, &name| skeleton.with(name, Keypoint::new(0.5, 0.5, 0.9)))
    }

    #[test]
    fn test_validate_detection_gate() {
        let aggregator = aggregator();
        assert!(!aggregator.validate_detection(&torso(0)));
        assert!(!aggregator.validate_detection(&torso(2)));
        assert!(aggregator.validate_detection(&torso(3)));
        assert!(aggregator.validate_detection(&torso(4)));
    }

    #[test]
    fn test_validate_detection_ignores_weak_and_non_torso_points() {
        let skeleton = torso(2)
            .with(KeypointName::LeftHip, Keypoint::new(0.45, 0.5, 0.5))
            .with(KeypointName::Nose, Keypoint::new(0.5, 0.15, 0.99))
            .with(KeypointName::LeftKnee, Keypoint::new(0.47, 0.7, 0.99));
        assert_eq!(aggregator().torso_landmark_count(&skeleton), 2);
        assert!(!aggregator().validate_detection(&skeleton));
    }

    #[test]
    fn test_gate_size_is_configurable() {
        let strict = LandmarkAggregator::new(&AggregationConfig { confidence_threshold: 0.5, min_torso_landmarks: 4 });
        assert!(!strict.validate_detection(&torso(3)));
        assert!(strict.validate_detection(&torso(4)));
    }
}
