use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use crate::config::config::PipelineConfig;
use crate::errors::{log_error, PostureError};
use crate::helper::landmark_aggregator::LandmarkAggregator;
use crate::helper::posture_metrics::PostureMetrics;
use crate::modules::pose_detector::KeypointDetector;
use crate::modules::thumbnail_generator::{thumbnail_file_name, thumbnail_url, ThumbnailEncoder};
use crate::modules::video_reader::{representative_frame, VideoDecoder};
use crate::pipeline::analysis::{AnalysisBatch, VideoAnalysis, VideoMetadata};
use crate::pipeline::request::{AnalysisRequest, UserMetadata, VideoAngle, VideoUpload};
use crate::utils::coordinate::Skeleton;
use crate::utils::files::{validate_video_file, RequestArtifacts};

/// Runs the posture analysis of a multi-view request.
///
/// Videos of one request are processed one after another. If any of them fails,
/// the whole request fails and every file created for it is removed.
pub struct PosturePipeline {
    config: PipelineConfig,
    detector: Box<dyn KeypointDetector>,
    decoder: Box<dyn VideoDecoder>,
    thumbnails: Box<dyn ThumbnailEncoder>,
    aggregator: LandmarkAggregator,
}

impl PosturePipeline {

    /// new initializes new instance of the pipeline
    ///
    /// # Arguments
    /// * `config` - pipeline configuration
    /// * `detector` - keypoint detector, owned exclusively by the pipeline
    /// * `decoder` - opens uploaded videos
    /// * `thumbnails` - encodes the representative frame
    pub fn new(
        config: PipelineConfig,
        detector: Box<dyn KeypointDetector>,
        decoder: Box<dyn VideoDecoder>,
        thumbnails: Box<dyn ThumbnailEncoder>,
    ) -> Self {
        let aggregator = LandmarkAggregator::new(&config.aggregation);
        PosturePipeline {
            config,
            detector,
            decoder,
            thumbnails,
            aggregator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// validate_request checks the shape of a request before anything is processed.
    ///
    /// # Arguments
    /// * `request` - the request to check
    ///
    /// # Returns
    /// * `Result<Vec<VideoAngle>, PostureError>` - the parsed angles, in request order
    pub fn validate_request(&self, request: &AnalysisRequest) -> Result<Vec<VideoAngle>, PostureError> {
        let count = request.videos.len();
        if count != request.angles.len() {
            return Err(PostureError::InvalidRequest(format!(
                "Number of videos ({count}) must match number of angles ({})",
                request.angles.len()
            )));
        }
        if count == 0 {
            return Err(PostureError::InvalidRequest("At least one video is required".to_string()));
        }
        if count > self.config.upload.max_videos {
            return Err(PostureError::InvalidRequest(format!(
                "Maximum {} videos allowed, got {count}",
                self.config.upload.max_videos
            )));
        }

        let angles = request
            .angles
            .iter()
            .map(|angle| angle.parse::<VideoAngle>())
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = HashSet::with_capacity(angles.len());
        if let Some(duplicate) = angles.iter().find(|angle| !seen.insert(**angle)) {
            return Err(PostureError::InvalidRequest(format!(
                "Duplicate angle: {duplicate}. Each video must have a unique angle"
            )));
        }

        for video in &request.videos {
            validate_video_file(&video.file_name, video.size(), &self.config.upload)?;
        }
        request.user.validate()?;
        Ok(angles)
    }

    /// analyze validates `request` and analyses its videos in order.
    ///
    /// # Arguments
    /// * `request` - videos, one angle per video and optional user metadata
    ///
    /// # Returns
    /// * `Result<AnalysisBatch, PostureError>` - one analysis per video, same order as the request
    pub async fn analyze(&mut self, request: AnalysisRequest) -> Result<AnalysisBatch, PostureError> {
        let started = Instant::now();
        let result = self.run(&request).await;
        match result {
            Ok(analyses) => {
                let total_processing_time_ms = elapsed_ms(started);
                info!(videos = analyses.len(), total_processing_time_ms, "Analysis -> batch complete");
                Ok(AnalysisBatch {
                    analyses,
                    total_processing_time_ms,
                    timestamp: Utc::now(),
                })
            }
            Err(e) => {
                log_error(&e);
                Err(e)
            }
        }
    }

    async fn run(&mut self, request: &AnalysisRequest) -> Result<Vec<VideoAnalysis>, PostureError> {
        let angles = self.validate_request(request)?;
        info!(videos = angles.len(), detector = self.detector.name(), "Analysis -> batch start");

        let mut artifacts = RequestArtifacts::new(&self.config.upload.dir)?;
        let mut analyses = Vec::with_capacity(angles.len());
        for (video, angle) in request.videos.iter().zip(angles) {
            let analysis = self.analyze_video(video, angle, request.user, &mut artifacts).await?;
            analyses.push(analysis);
        }
        artifacts.keep_thumbnails();
        Ok(analyses)
    }

    async fn analyze_video(
        &mut self,
        video: &VideoUpload,
        angle: VideoAngle,
        user: UserMetadata,
        artifacts: &mut RequestArtifacts,
    ) -> Result<VideoAnalysis, PostureError> {
        let started = Instant::now();
        let video_id = Uuid::new_v4();
        info!(%video_id, %angle, file = %video.file_name, "Analysis -> processing video");

        let upload_path = artifacts.upload_path(&video.file_name);
        tokio::fs::write(&upload_path, &video.content).await?;

        let detections = self.sample_detections(&upload_path)?;
        let landmarks = self.aggregator.aggregate(&detections);
        if !self.aggregator.validate_detection(&landmarks) {
            info!(
                %video_id,
                frames = detections.len(),
                torso = self.aggregator.torso_landmark_count(&landmarks),
                "Analysis -> pose quality below threshold"
            );
            return Err(PostureError::InsufficientPoseQuality);
        }

        let metrics = PostureMetrics::compute(&landmarks);
        metrics.check_bounds()?;

        let (thumbnail_path, thumbnail_base64) =
            self.write_thumbnail(video_id, &upload_path, &landmarks, artifacts).await?;

        let metadata = VideoMetadata {
            video_id,
            video_angle: angle,
            timestamp: Utc::now(),
            processing_time_ms: elapsed_ms(started),
            frame_count: detections.len(),
            user,
        };
        info!(%video_id, frames = metadata.frame_count, "Analysis -> video complete");

        Ok(VideoAnalysis {
            video_id,
            video_angle: angle,
            thumbnail_url: thumbnail_url(&thumbnail_path),
            thumbnail_path,
            thumbnail_base64,
            landmarks,
            joint_angles: metrics.joint_angles,
            alignment_vectors: metrics.alignment_vectors,
            symmetry: metrics.symmetry,
            metadata,
        })
    }

    /// sample_detections runs the detector on every `frame_stride`-th frame (1-based count)
    /// until `max_accepted_frames` frames produced a detection or the video ends.
    fn sample_detections(&mut self, path: &Path) -> Result<Vec<Skeleton>, PostureError> {
        let mut stream = self
            .decoder
            .open(path)
            .map_err(|e| PostureError::Decode(format!("{}: {e}", path.display())))?;

        let stride = self.config.sampling.frame_stride.max(1);
        let cap = self.config.sampling.max_accepted_frames;
        let mut counter: u64 = 0;
        let mut detections = Vec::new();
        while detections.len() < cap {
            let frame = stream
                .read_frame()
                .map_err(|e| PostureError::Decode(format!("{}: {e}", path.display())))?;
            let Some(frame) = frame else {
                break;
            };
            counter += 1;
            if counter % stride != 0 {
                continue;
            }
            if let Some(skeleton) = self.detector.detect(&frame)? {
                detections.push(skeleton);
            }
        }
        debug!(frames_read = counter, detections = detections.len(), "Analysis -> sampling done");
        Ok(detections)
    }

    async fn write_thumbnail(
        &self,
        video_id: Uuid,
        upload_path: &Path,
        landmarks: &Skeleton,
        artifacts: &mut RequestArtifacts,
    ) -> Result<(PathBuf, String), PostureError> {
        let frame = {
            let mut stream = self
                .decoder
                .open(upload_path)
                .map_err(|e| PostureError::Decode(format!("{}: {e}", upload_path.display())))?;
            representative_frame(stream.as_mut())?
        };
        let overlay = self.config.thumbnail.draw_landmarks.then_some(landmarks);
        let encoded = self.thumbnails.encode(&frame, overlay)?;

        let dir = &self.config.thumbnail.dir;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(thumbnail_file_name(video_id, self.thumbnails.extension()));
        artifacts.track_thumbnail(path.clone());
        tokio::fs::write(&path, &encoded.bytes).await?;
        debug!(path = %path.display(), bytes = encoded.bytes.len(), "Analysis -> thumbnail written");
        Ok((path, encoded.base64))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
