//! Vector math over normalized keypoints.
//!
//! Every function is pure. Missing inputs and degenerate configurations produce
//! `None` instead of an error so that a single missing landmark only removes
//! the metrics that depend on it.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use crate::utils::coordinate::Keypoint;

/// Direction and length of the segment between two keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentVector {
    pub dx: f64,
    pub dy: f64,
    pub magnitude: f64,
    /// Direction of the segment in `[0, 360)` degrees, measured with y pointing down.
    pub angle_degrees: f64,
}

fn to_vector(point: &Keypoint) -> Vector2<f64> {
    Vector2::new(point.x, point.y)
}

/// distance returns the euclidean distance between `a` and `b`, or `0.0` when either is missing.
pub fn distance(a: Option<Keypoint>, b: Option<Keypoint>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => (to_vector(&b) - to_vector(&a)).norm(),
        _ => 0.0,
    }
}

/// angle_at_vertex returns the angle in degrees opened at `vertex` by the rays towards `a` and `c`.
///
/// # Arguments
/// * `a` - first ray end
/// * `vertex` - the point at which the angle opens
/// * `c` - second ray end
///
/// # Returns
/// * `Option<f64>` - `None` if a point is missing or coincides with the vertex
pub fn angle_at_vertex(a: Option<Keypoint>, vertex: Option<Keypoint>, c: Option<Keypoint>) -> Option<f64> {
    let (a, vertex, c) = (a?, vertex?, c?);
    let v1 = to_vector(&a) - to_vector(&vertex);
    let v2 = to_vector(&c) - to_vector(&vertex);

    let mag1 = v1.norm();
    let mag2 = v2.norm();
    if mag1 == 0.0 || mag2 == 0.0 {
        return None;
    }

    let cos_angle = (v1.dot(&v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// alignment_vector describes the segment going from `a` to `b`.
pub fn alignment_vector(a: Option<Keypoint>, b: Option<Keypoint>) -> Option<AlignmentVector> {
    let (a, b) = (a?, b?);
    let delta = to_vector(&b) - to_vector(&a);

    let mut angle_degrees = delta.y.atan2(delta.x).to_degrees();
    if angle_degrees < 0.0 {
        angle_degrees += 360.0;
    }
    // a tiny negative angle rounds up to exactly 360 after the shift
    if angle_degrees >= 360.0 {
        angle_degrees -= 360.0;
    }

    Some(AlignmentVector {
        dx: delta.x,
        dy: delta.y,
        magnitude: delta.norm(),
        angle_degrees,
    })
}

/// symmetry_delta returns the unsigned vertical offset between a left/right pair.
pub fn symmetry_delta(left: Option<Keypoint>, right: Option<Keypoint>) -> Option<f64> {
    let (left, right) = (left?, right?);
    Some((left.y - right.y).abs())
}

/// width_ratio divides the horizontal width of the first pair by the width of the reference pair.
///
/// Returns `None` when any point is missing or the reference width is exactly zero.
pub fn width_ratio(
    left: Option<Keypoint>,
    right: Option<Keypoint>,
    reference_left: Option<Keypoint>,
    reference_right: Option<Keypoint>,
) -> Option<f64> {
    let (left, right) = (left?, right?);
    let (reference_left, reference_right) = (reference_left?, reference_right?);

    let width = (left.x - right.x).abs();
    let reference_width = (reference_left.x - reference_right.x).abs();
    if reference_width == 0.0 {
        return None;
    }
    Some(width / reference_width)
}

/// center_point returns the midpoint of `a` and `b`. The result carries no confidence.
pub fn center_point(a: Option<Keypoint>, b: Option<Keypoint>) -> Option<Keypoint> {
    let (a, b) = (a?, b?);
    let center = (to_vector(&a) + to_vector(&b)) / 2.0;
    Some(Keypoint::unscored(center.x, center.y))
}

/// denormalize maps normalized coordinates onto a frame of `width` x `height` pixels.
pub fn denormalize(x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
    (x * width as f64, y * height as f64)
}

#[cfg(test)]
mod tests {
    use crate::utils::coordinate::Keypoint;
    use crate::utils::geometry::{alignment_vector, angle_at_vertex, center_point, denormalize, distance, symmetry_delta, width_ratio};

    fn kp(x: f64, y: f64) -> Option<Keypoint> {
        Some(Keypoint::new(x, y, 0.9))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }

    #[test]
    fn test_distance() {
        assert_close(distance(kp(0.0, 0.0), kp(0.3, 0.4)), 0.5);
        assert_eq!(distance(None, kp(0.3, 0.4)), 0.0);
        assert_eq!(distance(kp(0.3, 0.4), None), 0.0);
    }

    #[test]
    fn test_angle_at_vertex_right_angle() {
        let angle = angle_at_vertex(kp(0.5, 0.2), kp(0.5, 0.5), kp(0.8, 0.5)).unwrap();
        assert_close(angle, 90.0);
    }

    #[test]
    fn test_angle_at_vertex_straight_and_folded() {
        assert_close(angle_at_vertex(kp(0.1, 0.5), kp(0.5, 0.5), kp(0.9, 0.5)).unwrap(), 180.0);
        assert_close(angle_at_vertex(kp(0.9, 0.5), kp(0.5, 0.5), kp(0.7, 0.5)).unwrap(), 0.0);
    }

    #[test]
    fn test_angle_at_vertex_stays_in_range() {
        let points = [(0.1, 0.2), (0.33, 0.91), (0.77, 0.05), (0.5, 0.5), (0.99, 0.98), (0.0, 1.0)];
        for &(ax, ay) in &points {
            for &(vx, vy) in &points {
                for &(cx, cy) in &points {
                    let angle = angle_at_vertex(kp(ax, ay), kp(vx, vy), kp(cx, cy));
                    let degenerate = (ax, ay) == (vx, vy) || (cx, cy) == (vx, vy);
                    match angle {
                        Some(angle) => {
                            assert!(!degenerate);
                            assert!((0.0..=180.0).contains(&angle), "{angle}");
                        }
                        None => assert!(degenerate),
                    }
                }
            }
        }
    }

    #[test]
    fn test_angle_at_vertex_missing_points() {
        assert!(angle_at_vertex(None, kp(0.5, 0.5), kp(0.8, 0.5)).is_none());
        assert!(angle_at_vertex(kp(0.5, 0.2), None, kp(0.8, 0.5)).is_none());
        assert!(angle_at_vertex(kp(0.5, 0.2), kp(0.5, 0.5), None).is_none());
    }

    #[test]
    fn test_alignment_vector_along_positive_x() {
        let vector = alignment_vector(kp(0.2, 0.5), kp(0.6, 0.5)).unwrap();
        assert_close(vector.dx, 0.4);
        assert_close(vector.dy, 0.0);
        assert_close(vector.magnitude, 0.4);
        assert_eq!(vector.angle_degrees, 0.0);
    }

    #[test]
    fn test_alignment_vector_normalizes_negative_angles() {
        // straight up in image space: dy < 0
        let up = alignment_vector(kp(0.5, 0.5), kp(0.5, 0.2)).unwrap();
        assert_close(up.angle_degrees, 270.0);

        let down = alignment_vector(kp(0.5, 0.2), kp(0.5, 0.5)).unwrap();
        assert_close(down.angle_degrees, 90.0);

        let tiny = alignment_vector(kp(0.0, 1e-300), kp(1.0, 0.0)).unwrap();
        assert!((0.0..360.0).contains(&tiny.angle_degrees));
    }

    #[test]
    fn test_alignment_vector_missing_point() {
        assert!(alignment_vector(None, kp(0.5, 0.5)).is_none());
        assert!(alignment_vector(kp(0.5, 0.5), None).is_none());
    }

    #[test]
    fn test_symmetry_delta() {
        assert_close(symmetry_delta(kp(0.42, 0.25), kp(0.58, 0.30)).unwrap(), 0.05);
        assert_close(symmetry_delta(kp(0.42, 0.30), kp(0.58, 0.25)).unwrap(), 0.05);
        assert!(symmetry_delta(kp(0.42, 0.25), None).is_none());
    }

    #[test]
    fn test_width_ratio() {
        let ratio = width_ratio(kp(0.42, 0.25), kp(0.58, 0.25), kp(0.45, 0.5), kp(0.55, 0.5)).unwrap();
        assert_close(ratio, 1.6);
    }

    #[test]
    fn test_width_ratio_zero_reference_width() {
        for x in [0.0, 0.3, 0.5, 1.0] {
            assert!(width_ratio(kp(0.42, 0.25), kp(0.58, 0.25), kp(x, 0.4), kp(x, 0.6)).is_none());
        }
        assert!(width_ratio(kp(0.42, 0.25), None, kp(0.45, 0.5), kp(0.55, 0.5)).is_none());
    }

    #[test]
    fn test_center_point() {
        let center = center_point(kp(0.4, 0.2), kp(0.6, 0.4)).unwrap();
        assert_close(center.x, 0.5);
        assert_close(center.y, 0.3);
        assert_eq!(center.confidence, None);
        assert!(center_point(None, kp(0.6, 0.4)).is_none());
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(0.5, 0.25, 640, 480), (320.0, 120.0));
        assert_eq!(denormalize(1.0, 1.0, 0, 0), (0.0, 0.0));
    }
}
