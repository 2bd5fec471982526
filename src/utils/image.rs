use anyhow::Error;
use base64::{engine::general_purpose, Engine as _};

/// A decoded video frame: tightly packed, interleaved BGR bytes, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    /// new wraps a BGR pixel buffer, checking that it matches the declared size.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, Error> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(Error::msg(format!(
                "frame buffer holds {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Frame { width, height, data })
    }

    /// blank creates a black frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Frame {
            width,
            height,
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[offset], self.data[offset + 1], self.data[offset + 2]])
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// encode_base64 returns the standard (padded) base64 text of `bytes`.
pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// fit_within computes the size of a `width` x `height` image scaled down to fit the bounds.
///
/// Images already inside the bounds keep their size; nothing is upscaled.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale_x = max_width as f64 / width as f64;
    let scale_y = max_height as f64 / height as f64;
    let scale = scale_x.min(scale_y).min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }
    (
        ((width as f64 * scale) as u32).max(1),
        ((height as f64 * scale) as u32).max(1),
    )
}

#[cfg(feature = "opencv")]
pub use self::cv::{frame_to_mat, mat_to_frame};

#[cfg(feature = "opencv")]
mod cv {
    use anyhow::Error;
    use opencv::core::{Mat, CV_8UC3};
    use opencv::prelude::*;
    use crate::utils::image::Frame;

    /// mat_to_frame copies an 8-bit, 3-channel OpenCV matrix into a `Frame`.
    pub fn mat_to_frame(mat: &Mat) -> Result<Frame, Error> {
        if mat.typ() != CV_8UC3 {
            return Err(Error::msg(format!("unsupported matrix type {}, expected CV_8UC3", mat.typ())));
        }
        let data = if mat.is_continuous() {
            mat.data_bytes()?.to_vec()
        } else {
            mat.try_clone()?.data_bytes()?.to_vec()
        };
        Frame::new(mat.cols() as u32, mat.rows() as u32, data)
    }

    /// frame_to_mat copies a `Frame` into a new owned OpenCV matrix.
    pub fn frame_to_mat(frame: &Frame) -> Result<Mat, Error> {
        let flat = Mat::from_slice(&frame.data)?;
        let shaped = flat.reshape(3, frame.height as i32)?;
        Ok(shaped.try_clone()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::image::{encode_base64, fit_within, Frame};

    #[test]
    fn test_frame_new_checks_buffer_size() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(Frame::new(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn test_frame_pixel() {
        let mut data = vec![0; 2 * 2 * 3];
        data[9..12].copy_from_slice(&[1, 2, 3]);
        let frame = Frame::new(2, 2, data).unwrap();
        assert_eq!(frame.pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b"posture"), "cG9zdHVyZQ==");
        assert_eq!(encode_base64(&[]), "");
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(fit_within(320, 240, 400, 600), (320, 240));
        assert_eq!(fit_within(1600, 900, 400, 600), (400, 225));
        assert_eq!(fit_within(1080, 1920, 400, 600), (337, 600));
    }
}
