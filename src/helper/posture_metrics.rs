use anyhow::Error;
use serde::{Deserialize, Serialize};
use crate::utils::coordinate::{KeypointName, Skeleton};
use crate::utils::geometry::{alignment_vector, angle_at_vertex, center_point, symmetry_delta, width_ratio, AlignmentVector};

/// Upper bound accepted for a joint angle, in degrees.
pub const MAX_JOINT_ANGLE: f64 = 180.0;
/// Upper bound accepted for a normalized left/right height difference.
pub const MAX_HEIGHT_DIFF: f64 = 1.0;
/// Upper bound accepted for a shoulder/hip width ratio.
pub const MAX_WIDTH_RATIO: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointAngles {
    pub neck_angle: Option<f64>,
    pub spine_angle: Option<f64>,
    pub left_shoulder_angle: Option<f64>,
    pub right_shoulder_angle: Option<f64>,
    pub left_elbow_angle: Option<f64>,
    pub right_elbow_angle: Option<f64>,
    pub left_hip_angle: Option<f64>,
    pub right_hip_angle: Option<f64>,
    pub left_knee_angle: Option<f64>,
    pub right_knee_angle: Option<f64>,
}

impl JointAngles {
    fn named(&self) -> [(&'static str, Option<f64>); 10] {
        [
            ("neck_angle", self.neck_angle),
            ("spine_angle", self.spine_angle),
            ("left_shoulder_angle", self.left_shoulder_angle),
            ("right_shoulder_angle", self.right_shoulder_angle),
            ("left_elbow_angle", self.left_elbow_angle),
            ("right_elbow_angle", self.right_elbow_angle),
            ("left_hip_angle", self.left_hip_angle),
            ("right_hip_angle", self.right_hip_angle),
            ("left_knee_angle", self.left_knee_angle),
            ("right_knee_angle", self.right_knee_angle),
        ]
    }
}

/// Segment directions along the left side of the body, head to feet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignmentVectors {
    pub ear_to_shoulder: Option<AlignmentVector>,
    pub shoulder_to_hip: Option<AlignmentVector>,
    pub hip_to_knee: Option<AlignmentVector>,
    pub knee_to_ankle: Option<AlignmentVector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Symmetry {
    pub shoulder_height_diff: Option<f64>,
    pub hip_height_diff: Option<f64>,
    pub shoulder_width_ratio: Option<f64>,
    pub hip_width_ratio: Option<f64>,
}

/// Everything derived from one aggregated skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PostureMetrics {
    pub joint_angles: JointAngles,
    pub alignment_vectors: AlignmentVectors,
    pub symmetry: Symmetry,
}

impl PostureMetrics {

    /// compute derives every metric. Missing keypoints leave the dependent metrics empty.
    pub fn compute(skeleton: &Skeleton) -> Self {
        PostureMetrics {
            joint_angles: joint_angles(skeleton),
            alignment_vectors: alignment_vectors(skeleton),
            symmetry: symmetry(skeleton),
        }
    }

    /// check_bounds verifies the documented value ranges of every present metric.
    pub fn check_bounds(&self) -> Result<(), Error> {
        for (name, value) in self.joint_angles.named() {
            check_range(name, value, MAX_JOINT_ANGLE)?;
        }
        check_range("shoulder_height_diff", self.symmetry.shoulder_height_diff, MAX_HEIGHT_DIFF)?;
        check_range("hip_height_diff", self.symmetry.hip_height_diff, MAX_HEIGHT_DIFF)?;
        check_range("shoulder_width_ratio", self.symmetry.shoulder_width_ratio, MAX_WIDTH_RATIO)?;
        check_range("hip_width_ratio", self.symmetry.hip_width_ratio, MAX_WIDTH_RATIO)?;
        Ok(())
    }
}

fn check_range(name: &str, value: Option<f64>, max: f64) -> Result<(), Error> {
    match value {
        Some(v) if !(0.0..=max).contains(&v) => {
            Err(Error::msg(format!("{name} = {v} is outside the accepted range [0, {max}]")))
        }
        _ => Ok(()),
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn ear(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftEar,
            Side::Right => KeypointName::RightEar,
        }
    }

    fn shoulder(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftShoulder,
            Side::Right => KeypointName::RightShoulder,
        }
    }

    fn elbow(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftElbow,
            Side::Right => KeypointName::RightElbow,
        }
    }

    fn wrist(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftWrist,
            Side::Right => KeypointName::RightWrist,
        }
    }

    fn hip(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftHip,
            Side::Right => KeypointName::RightHip,
        }
    }

    fn knee(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftKnee,
            Side::Right => KeypointName::RightKnee,
        }
    }

    fn ankle(self) -> KeypointName {
        match self {
            Side::Left => KeypointName::LeftAnkle,
            Side::Right => KeypointName::RightAnkle,
        }
    }
}

fn angle(skeleton: &Skeleton, a: KeypointName, vertex: KeypointName, c: KeypointName) -> Option<f64> {
    angle_at_vertex(skeleton.get(a), skeleton.get(vertex), skeleton.get(c))
}

/// joint_angles measures the ten joint angles of the skeleton.
///
/// The neck angle uses the left side only; the spine angle is the only metric
/// built from left/right midpoints.
pub fn joint_angles(skeleton: &Skeleton) -> JointAngles {
    let shoulder_angle = |side: Side| angle(skeleton, side.ear(), side.shoulder(), side.elbow());
    let elbow_angle = |side: Side| angle(skeleton, side.shoulder(), side.elbow(), side.wrist());
    let hip_angle = |side: Side| angle(skeleton, side.shoulder(), side.hip(), side.knee());
    let knee_angle = |side: Side| angle(skeleton, side.hip(), side.knee(), side.ankle());

    JointAngles {
        neck_angle: angle(skeleton, KeypointName::LeftEar, KeypointName::LeftShoulder, KeypointName::LeftHip),
        spine_angle: spine_angle(skeleton),
        left_shoulder_angle: shoulder_angle(Side::Left),
        right_shoulder_angle: shoulder_angle(Side::Right),
        left_elbow_angle: elbow_angle(Side::Left),
        right_elbow_angle: elbow_angle(Side::Right),
        left_hip_angle: hip_angle(Side::Left),
        right_hip_angle: hip_angle(Side::Right),
        left_knee_angle: knee_angle(Side::Left),
        right_knee_angle: knee_angle(Side::Right),
    }
}

fn spine_angle(skeleton: &Skeleton) -> Option<f64> {
    let midpoint = |left: KeypointName, right: KeypointName| center_point(skeleton.get(left), skeleton.get(right));
    angle_at_vertex(
        midpoint(KeypointName::LeftShoulder, KeypointName::RightShoulder),
        midpoint(KeypointName::LeftHip, KeypointName::RightHip),
        midpoint(KeypointName::LeftKnee, KeypointName::RightKnee),
    )
}

/// alignment_vectors follows the left side of the body from ear to ankle.
// TODO: add the right-side chain once product decides whether side views need it.
pub fn alignment_vectors(skeleton: &Skeleton) -> AlignmentVectors {
    let segment = |from: KeypointName, to: KeypointName| alignment_vector(skeleton.get(from), skeleton.get(to));
    AlignmentVectors {
        ear_to_shoulder: segment(KeypointName::LeftEar, KeypointName::LeftShoulder),
        shoulder_to_hip: segment(KeypointName::LeftShoulder, KeypointName::LeftHip),
        hip_to_knee: segment(KeypointName::LeftHip, KeypointName::LeftKnee),
        knee_to_ankle: segment(KeypointName::LeftKnee, KeypointName::LeftAnkle),
    }
}

/// symmetry compares the left and right shoulders and hips.
///
/// Both width ratios are computed independently, so they are reciprocal only
/// when both reference widths are non-zero.
pub fn symmetry(skeleton: &Skeleton) -> Symmetry {
    let ls = skeleton.get(KeypointName::LeftShoulder);
    let rs = skeleton.get(KeypointName::RightShoulder);
    let lh = skeleton.get(KeypointName::LeftHip);
    let rh = skeleton.get(KeypointName::RightHip);

    Symmetry {
        shoulder_height_diff: symmetry_delta(ls, rs),
        hip_height_diff: symmetry_delta(lh, rh),
        shoulder_width_ratio: width_ratio(ls, rs, lh, rh),
        hip_width_ratio: width_ratio(lh, rh, ls, rs),
    }
}
