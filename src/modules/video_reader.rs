use std::path::Path;
use anyhow::Error;
use crate::utils::image::Frame;

/// An ordered, finite and seekable sequence of decoded frames.
pub trait FrameStream: Send {
    /// read_frame returns the next frame, or `None` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>, Error>;

    /// frame_count returns the number of frames the container announces, if known.
    fn frame_count(&self) -> Option<u64>;

    /// seek moves the read position to the zero-based frame `index`.
    fn seek(&mut self, index: u64) -> Result<(), Error>;
}

/// Opens video files. Every call to `open` yields a stream positioned on the first frame.
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>, Error>;
}

/// representative_frame picks the still used for the thumbnail: the middle frame,
/// or the first frame when the middle one cannot be read.
pub fn representative_frame(stream: &mut dyn FrameStream) -> Result<Frame, Error> {
    let total = stream.frame_count().unwrap_or(0);
    if total == 0 {
        return Err(Error::msg("could not extract frame from video"));
    }

    stream.seek(total / 2)?;
    if let Some(frame) = stream.read_frame()? {
        return Ok(frame);
    }

    stream.seek(0)?;
    stream
        .read_frame()?
        .ok_or_else(|| Error::msg("could not extract frame from video"))
}

/// Frames that are already decoded, e.g. grabbed from a camera.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVideo {
    frames: Vec<Frame>,
    position: usize,
}

impl InMemoryVideo {
    pub fn new(frames: Vec<Frame>) -> Self {
        InMemoryVideo { frames, position: 0 }
    }
}

impl FrameStream for InMemoryVideo {
    fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn seek(&mut self, index: u64) -> Result<(), Error> {
        self.position = index as usize;
        Ok(())
    }
}

#[cfg(feature = "opencv")]
pub use self::cv::OpenCvVideoReader;

#[cfg(feature = "opencv")]
mod cv {
    use std::path::Path;
    use anyhow::Error;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::videoio::{self, VideoCapture};
    use crate::modules::video_reader::{FrameStream, VideoDecoder};
    use crate::utils::image::{mat_to_frame, Frame};

    /// Decodes video files with OpenCV's `VideoCapture`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct OpenCvVideoReader;

    impl VideoDecoder for OpenCvVideoReader {
        fn open(&self, path: &Path) -> Result<Box<dyn FrameStream>, Error> {
            let capture = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(Error::msg(format!("could not open video: {}", path.display())));
            }
            Ok(Box::new(CaptureStream { capture }))
        }
    }

    struct CaptureStream {
        capture: VideoCapture,
    }

    impl FrameStream for CaptureStream {
        fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
            let mut mat = Mat::default();
            if !self.capture.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }
            Ok(Some(mat_to_frame(&mat)?))
        }

        fn frame_count(&self) -> Option<u64> {
            self.capture
                .get(videoio::CAP_PROP_FRAME_COUNT)
                .ok()
                .filter(|count| *count > 0.0)
                .map(|count| count as u64)
        }

        fn seek(&mut self, index: u64) -> Result<(), Error> {
            self.capture.set(videoio::CAP_PROP_POS_FRAMES, index as f64)?;
            Ok(())
        }
    }

    impl Drop for CaptureStream {
        fn drop(&mut self) {
            let _ = self.capture.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Error;
    use crate::modules::video_reader::{representative_frame, FrameStream, InMemoryVideo};
    use crate::utils::image::Frame;

    fn numbered(count: u8) -> Vec<Frame> {
        (0..count).map(|i| Frame::new(1, 1, vec![i, i, i]).unwrap()).collect()
    }

    #[test]
    fn test_in_memory_video_reads_in_order_and_restarts() {
        let mut video = InMemoryVideo::new(numbered(3));
        assert_eq!(video.read_frame().unwrap().unwrap().data[0], 0);
        assert_eq!(video.read_frame().unwrap().unwrap().data[0], 1);
        assert_eq!(video.read_frame().unwrap().unwrap().data[0], 2);
        assert!(video.read_frame().unwrap().is_none());
        video.seek(0).unwrap();
        assert_eq!(video.read_frame().unwrap().unwrap().data[0], 0);
    }

    #[test]
    fn test_representative_frame_is_the_middle_one() {
        let mut video = InMemoryVideo::new(numbered(5));
        assert_eq!(representative_frame(&mut video).unwrap().data[0], 2);
    }

    /// Announces more frames than it can deliver, like a truncated file.
    struct Truncated(InMemoryVideo);

    impl FrameStream for Truncated {
        fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
            self.0.read_frame()
        }

        fn frame_count(&self) -> Option<u64> {
            Some(100)
        }

        fn seek(&mut self, index: u64) -> Result<(), Error> {
            self.0.seek(index)
        }
    }

    #[test]
    fn test_representative_frame_falls_back_to_first() {
        let mut video = Truncated(InMemoryVideo::new(numbered(3)));
        assert_eq!(representative_frame(&mut video).unwrap().data[0], 0);
    }

    #[test]
    fn test_representative_frame_of_empty_video() {
        let mut video = InMemoryVideo::new(vec![]);
        assert!(representative_frame(&mut video).is_err());
    }
}
