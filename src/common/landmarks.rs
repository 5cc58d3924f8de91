//! Hand keypoints as produced by the landmark model.
//!
//! A hand is 21 points in frame pixel space (`x`, `y`) plus a relative depth
//! (`z`). Point 0 is the wrist; each finger contributes four points running
//! from the knuckle to the tip.

use serde::{Deserialize, Serialize};

/// Number of keypoints in a complete hand.
pub const LANDMARK_COUNT: usize = 21;

/// A single keypoint, serialized as the `[x, y, z]` triple the model emits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance over all three coordinates.
    ///
    /// The axes are not normalized against each other: `x`/`y` are pixels and
    /// `z` is the model's raw depth scalar.
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(landmark: Landmark) -> Self {
        [landmark.x, landmark.y, landmark.z]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// Thumb to pinky.
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip_index(self) -> usize {
        match self {
            Finger::Thumb => 4,
            Finger::Index => 8,
            Finger::Middle => 12,
            Finger::Ring => 16,
            Finger::Pinky => 20,
        }
    }

    /// The joint the tip is measured against.
    pub fn joint_index(self) -> usize {
        match self {
            Finger::Thumb => 3,
            Finger::Index => 6,
            Finger::Middle => 10,
            Finger::Ring => 14,
            Finger::Pinky => 18,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

/// One detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandLandmarks {
    pub landmarks: Vec<Landmark>,
    #[serde(default, alias = "handInViewConfidence", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl HandLandmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARK_COUNT
    }

    /// Tip and joint of `finger`, if both points are present.
    pub fn finger_points(&self, finger: Finger) -> Option<(&Landmark, &Landmark)> {
        Some((self.get(finger.tip_index())?, self.get(finger.joint_index())?))
    }

    /// Area of the x/y bounding box, used to pick the most prominent hand.
    pub fn bounding_area(&self) -> f32 {
        let mut points = self.landmarks.iter();
        let Some(first) = points.next() else {
            return 0.0;
        };
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for point in points {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        (max_x - min_x) * (max_y - min_y)
    }
}
