use std::path::Path;
use anyhow::Error;
use uuid::Uuid;
use crate::utils::coordinate::{Keypoint, KeypointName, Skeleton, SKELETON_CONNECTIONS};
use crate::utils::image::{encode_base64, Frame};

/// URL prefix under which persisted thumbnails are served.
pub const THUMBNAIL_URL_PREFIX: &str = "/static/thumbnails";

/// An encoded still image together with its base64 text.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedThumbnail {
    pub bytes: Vec<u8>,
    pub base64: String,
}

impl EncodedThumbnail {
    pub fn new(bytes: Vec<u8>) -> Self {
        let base64 = encode_base64(&bytes);
        EncodedThumbnail { bytes, base64 }
    }
}

/// Turns a frame, optionally annotated with a skeleton, into a compressed image.
pub trait ThumbnailEncoder: Send + Sync {
    fn encode(&self, frame: &Frame, overlay: Option<&Skeleton>) -> Result<EncodedThumbnail, Error>;

    /// extension of the produced files, without the dot.
    fn extension(&self) -> &'static str {
        "jpg"
    }
}

/// thumbnail_file_name derives a fresh file name from a random identifier.
pub fn thumbnail_file_name(id: Uuid, extension: &str) -> String {
    format!("thumb_{id}.{extension}")
}

/// thumbnail_url returns the public URL of a persisted thumbnail.
pub fn thumbnail_url(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(format!("{THUMBNAIL_URL_PREFIX}/{name}"))
}

/// overlay_points lists the keypoints confident enough to be drawn.
pub fn overlay_points(skeleton: &Skeleton, threshold: f64) -> Vec<(KeypointName, Keypoint)> {
    skeleton
        .iter()
        .filter_map(|(name, keypoint)| keypoint.map(|k| (name, k)))
        .filter(|(_, keypoint)| keypoint.is_confident(threshold))
        .collect()
}

/// overlay_segments lists the bones whose two ends are both confident.
pub fn overlay_segments(skeleton: &Skeleton, threshold: f64) -> Vec<(Keypoint, Keypoint)> {
    SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(start, end)| {
            let start = skeleton.get(start).filter(|k| k.is_confident(threshold))?;
            let end = skeleton.get(end).filter(|k| k.is_confident(threshold))?;
            Some((start, end))
        })
        .collect()
}

#[cfg(feature = "opencv")]
pub use self::cv::OpenCvThumbnailGenerator;

#[cfg(feature = "opencv")]
mod cv {
    use anyhow::Error;
    use opencv::core::{Mat, Point, Scalar, Size, Vector};
    use opencv::imgcodecs::{imencode, IMWRITE_JPEG_QUALITY};
    use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, INTER_AREA, LINE_8};
    use opencv::prelude::*;
    use crate::config::config::ThumbnailConfig;
    use crate::modules::thumbnail_generator::{overlay_points, overlay_segments, EncodedThumbnail, ThumbnailEncoder};
    use crate::utils::coordinate::Skeleton;
    use crate::utils::image::{fit_within, frame_to_mat, Frame};

    /// JPEG thumbnails drawn and encoded with OpenCV.
    #[derive(Debug, Clone)]
    pub struct OpenCvThumbnailGenerator {
        quality: i32,
        max_width: u32,
        max_height: u32,
        confidence_threshold: f64,
    }

    impl OpenCvThumbnailGenerator {
        pub fn new(config: &ThumbnailConfig, confidence_threshold: f64) -> Self {
            OpenCvThumbnailGenerator {
                quality: config.quality,
                max_width: config.max_width,
                max_height: config.max_height,
                confidence_threshold,
            }
        }

        fn draw_skeleton(&self, image: &mut Mat, skeleton: &Skeleton, width: u32, height: u32) -> Result<(), Error> {
            let white = Scalar::new(255.0, 255.0, 255.0, 0.0);
            let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
            let black = Scalar::new(0.0, 0.0, 0.0, 0.0);

            for (start, end) in overlay_segments(skeleton, self.confidence_threshold) {
                let (x1, y1) = start.to_pixel(width, height);
                let (x2, y2) = end.to_pixel(width, height);
                imgproc::line(image, Point::new(x1, y1), Point::new(x2, y2), white, 2, LINE_8, 0)?;
            }

            for (name, keypoint) in overlay_points(skeleton, self.confidence_threshold) {
                let (x, y) = keypoint.to_pixel(width, height);
                let center = Point::new(x, y);
                imgproc::circle(image, center, 8, green, -1, LINE_8, 0)?;
                imgproc::circle(image, center, 8, black, 2, LINE_8, 0)?;
                imgproc::put_text(
                    image,
                    &name.label(),
                    Point::new(x + 10, y - 10),
                    FONT_HERSHEY_SIMPLEX,
                    0.4,
                    white,
                    1,
                    LINE_8,
                    false,
                )?;
            }
            Ok(())
        }
    }

    impl ThumbnailEncoder for OpenCvThumbnailGenerator {
        fn encode(&self, frame: &Frame, overlay: Option<&Skeleton>) -> Result<EncodedThumbnail, Error> {
            let mut image = frame_to_mat(frame)?;
            if let Some(skeleton) = overlay {
                self.draw_skeleton(&mut image, skeleton, frame.width, frame.height)?;
            }

            let (width, height) = fit_within(frame.width, frame.height, self.max_width, self.max_height);
            if (width, height) != (frame.width, frame.height) {
                let mut resized = Mat::default();
                imgproc::resize(
                    &image,
                    &mut resized,
                    Size::new(width as i32, height as i32),
                    0.0,
                    0.0,
                    INTER_AREA,
                )?;
                image = resized;
            }

            let mut buffer = Vector::<u8>::new();
            let params = Vector::<i32>::from_slice(&[IMWRITE_JPEG_QUALITY, self.quality]);
            if !imencode(".jpg", &image, &mut buffer, &params)? {
                return Err(Error::msg("thumbnail encoding failed"));
            }
            Ok(EncodedThumbnail::new(buffer.to_vec()))
        }
    }
}
