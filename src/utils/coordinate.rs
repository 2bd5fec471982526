use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::utils::geometry::denormalize;

/// Anatomical slots of the 17-point body model, in detector output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointName; KeypointName::COUNT] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    /// Slots that anchor the torso, inspected by the reliability gate.
    pub const TORSO: [KeypointName; 4] = [
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftHip,
        KeypointName::RightHip,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "left_eye",
            KeypointName::RightEye => "right_eye",
            KeypointName::LeftEar => "left_ear",
            KeypointName::RightEar => "right_ear",
            KeypointName::LeftShoulder => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow => "left_elbow",
            KeypointName::RightElbow => "right_elbow",
            KeypointName::LeftWrist => "left_wrist",
            KeypointName::RightWrist => "right_wrist",
            KeypointName::LeftHip => "left_hip",
            KeypointName::RightHip => "right_hip",
            KeypointName::LeftKnee => "left_knee",
            KeypointName::RightKnee => "right_knee",
            KeypointName::LeftAnkle => "left_ankle",
            KeypointName::RightAnkle => "right_ankle",
        }
    }

    /// label returns the human readable slot name drawn next to a keypoint, e.g. `Left Shoulder`.
    pub fn label(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Bones drawn between keypoints on the thumbnail overlay.
pub const SKELETON_CONNECTIONS: [(KeypointName, KeypointName); 15] = [
    (KeypointName::LeftEar, KeypointName::LeftShoulder),
    (KeypointName::RightEar, KeypointName::RightShoulder),
    (KeypointName::LeftEye, KeypointName::RightEye),
    (KeypointName::LeftShoulder, KeypointName::RightShoulder),
    (KeypointName::LeftShoulder, KeypointName::LeftElbow),
    (KeypointName::RightShoulder, KeypointName::RightElbow),
    (KeypointName::LeftElbow, KeypointName::LeftWrist),
    (KeypointName::RightElbow, KeypointName::RightWrist),
    (KeypointName::LeftShoulder, KeypointName::LeftHip),
    (KeypointName::RightShoulder, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::LeftKnee),
    (KeypointName::RightHip, KeypointName::RightKnee),
    (KeypointName::LeftKnee, KeypointName::LeftAnkle),
    (KeypointName::RightKnee, KeypointName::RightAnkle),
];

/// A detected anatomical point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Keypoint { x, y, confidence: Some(confidence) }
    }

    /// unscored builds a derived point (e.g. a midpoint) that carries no detector confidence.
    pub fn unscored(x: f64, y: f64) -> Self {
        Keypoint { x, y, confidence: None }
    }

    /// is_confident reports whether the confidence is present and strictly above `threshold`.
    pub fn is_confident(&self, threshold: f64) -> bool {
        self.confidence.is_some_and(|confidence| confidence > threshold)
    }

    /// to_pixel maps the normalized position onto a `width` x `height` frame.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let (x, y) = denormalize(self.x, self.y, width, height);
        (x as i32, y as i32)
    }
}

/// Fixed 17-slot keypoint set; every slot is independently present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<KeypointName, Option<Keypoint>>",
    into = "BTreeMap<KeypointName, Option<Keypoint>>"
)]
pub struct Skeleton {
    slots: [Option<Keypoint>; KeypointName::COUNT],
}

impl Skeleton {
    pub fn new() -> Self {
        Skeleton::default()
    }

    pub fn get(&self, name: KeypointName) -> Option<Keypoint> {
        self.slots[name.index()]
    }

    pub fn set(&mut self, name: KeypointName, keypoint: Option<Keypoint>) {
        self.slots[name.index()] = keypoint;
    }

    /// with returns a copy of the skeleton where `name` holds `keypoint`.
    pub fn with(mut self, name: KeypointName, keypoint: Keypoint) -> Self {
        self.set(name, Some(keypoint));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeypointName, Option<Keypoint>)> + '_ {
        KeypointName::ALL.iter().map(|&name| (name, self.get(name)))
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

impl From<BTreeMap<KeypointName, Option<Keypoint>>> for Skeleton {
    fn from(map: BTreeMap<KeypointName, Option<Keypoint>>) -> Self {
        let mut skeleton = Skeleton::new();
        for (name, keypoint) in map {
            skeleton.set(name, keypoint);
        }
        skeleton
    }
}

impl From<Skeleton> for BTreeMap<KeypointName, Option<Keypoint>> {
    fn from(skeleton: Skeleton) -> Self {
        skeleton.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::coordinate::{Keypoint, KeypointName, Skeleton, SKELETON_CONNECTIONS};

    #[test]
    fn test_keypoint_name_from_index() {
        assert_eq!(KeypointName::from_index(0), Some(KeypointName::Nose));
        assert_eq!(KeypointName::from_index(11), Some(KeypointName::LeftHip));
        assert_eq!(KeypointName::from_index(16), Some(KeypointName::RightAnkle));
        assert_eq!(KeypointName::from_index(17), None);
        for (i, name) in KeypointName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i);
        }
    }

    #[test]
    fn test_keypoint_label() {
        assert_eq!(KeypointName::LeftShoulder.label(), "Left Shoulder");
        assert_eq!(KeypointName::Nose.label(), "Nose");
    }

    #[test]
    fn test_keypoint_is_confident() {
        assert!(Keypoint::new(0.5, 0.5, 0.7).is_confident(0.5));
        assert!(!Keypoint::new(0.5, 0.5, 0.5).is_confident(0.5));
        assert!(!Keypoint::unscored(0.5, 0.5).is_confident(0.0));
    }

    #[test]
    fn test_keypoint_to_pixel() {
        let (px, py) = Keypoint::new(0.5, 0.25, 1.0).to_pixel(640, 480);
        assert_eq!((px, py), (320, 120));
    }

    #[test]
    fn test_skeleton_slots_are_independent() {
        let skeleton = Skeleton::new().with(KeypointName::LeftHip, Keypoint::new(0.45, 0.5, 0.9));
        assert_eq!(skeleton.present_count(), 1);
        assert!(skeleton.get(KeypointName::RightHip).is_none());
        assert_eq!(skeleton.get(KeypointName::LeftHip).map(|k| k.x), Some(0.45));
    }

    #[test]
    fn test_skeleton_serializes_every_slot_by_name() {
        let skeleton = Skeleton::new().with(KeypointName::Nose, Keypoint::new(0.5, 0.15, 0.9));
        let value = serde_json::to_value(skeleton).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), KeypointName::COUNT);
        assert_eq!(object["nose"]["x"], 0.5);
        assert!(object["right_ankle"].is_null());

        let parsed: Skeleton = serde_json::from_str(r#"{"left_knee":{"x":0.47,"y":0.7}}"#).unwrap();
        assert_eq!(parsed.present_count(), 1);
        assert_eq!(parsed.get(KeypointName::LeftKnee).unwrap().confidence, None);
    }

    #[test]
    fn test_connections_never_loop_on_one_slot() {
        for (a, b) in SKELETON_CONNECTIONS {
            assert_ne!(a, b);
        }
    }
}
