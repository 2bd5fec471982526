use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::helper::posture_metrics::{AlignmentVectors, JointAngles, Symmetry};
use crate::pipeline::request::{UserMetadata, VideoAngle};
use crate::utils::coordinate::Skeleton;

/// Processing details attached to each analysed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: Uuid,
    pub video_angle: VideoAngle,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    /// Number of sampled frames in which a pose was detected.
    pub frame_count: usize,
    #[serde(flatten)]
    pub user: UserMetadata,
}

/// Result for one video of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub video_id: Uuid,
    pub video_angle: VideoAngle,
    pub thumbnail_path: PathBuf,
    /// URL under which the thumbnail is served.
    pub thumbnail_url: Option<String>,
    pub thumbnail_base64: String,
    pub landmarks: Skeleton,
    pub joint_angles: JointAngles,
    pub alignment_vectors: AlignmentVectors,
    pub symmetry: Symmetry,
    pub metadata: VideoMetadata,
}

/// All results of one request, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub analyses: Vec<VideoAnalysis>,
    pub total_processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisBatch {
    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    pub fn angles(&self) -> Vec<VideoAngle> {
        self.analyses.iter().map(|a| a.video_angle).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// health_check reports liveness; it does not touch the detector or the filesystem.
pub fn health_check() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::analysis::health_check;

    #[test]
    fn test_health_check() {
        let health = health_check();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].is_string());
    }
}
