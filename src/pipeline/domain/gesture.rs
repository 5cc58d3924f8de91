//! Finger-state classification.
//!
//! Each finger is judged extended when the distance from its tip to its mid
//! joint exceeds a pixel-space threshold. The per-finger judgments are then
//! folded into a [`GestureVerdict`] according to a [`GesturePolicy`].

use serde::{Deserialize, Serialize};

use crate::common::{Finger, HandLandmarks};

/// Tip-to-joint distance above which a finger counts as extended.
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureVerdict {
    Free,
    Hold,
    None,
}

impl GestureVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureVerdict::Free => "free",
            GestureVerdict::Hold => "hold",
            GestureVerdict::None => "none",
        }
    }
}

/// How finger counts map to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesturePolicy {
    /// Free with two or more open fingers, hold with two or more closed.
    #[serde(rename = "min2", alias = "hold")]
    Hold,
    /// Free (release) with three or more open fingers, hold otherwise.
    #[serde(rename = "min3", alias = "release")]
    Release,
}

impl Default for GesturePolicy {
    fn default() -> Self {
        GesturePolicy::Hold
    }
}

impl GesturePolicy {
    pub fn free_threshold(&self) -> usize {
        match self {
            GesturePolicy::Hold => 2,
            GesturePolicy::Release => 3,
        }
    }

    pub fn hold_threshold(&self) -> usize {
        match self {
            GesturePolicy::Hold => 2,
            // closed >= 3 is exactly "fewer than three open"
            GesturePolicy::Release => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub distance_threshold: f32,
    pub policy: GesturePolicy,
    /// Overrides the policy's open-finger count for `Free`.
    pub free_threshold: Option<usize>,
    /// Overrides the policy's closed-finger count for `Hold`.
    pub hold_threshold: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            policy: GesturePolicy::default(),
            free_threshold: None,
            hold_threshold: None,
        }
    }
}

impl ClassifierConfig {
    pub fn with_policy(policy: GesturePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn effective_free_threshold(&self) -> usize {
        self.free_threshold
            .unwrap_or_else(|| self.policy.free_threshold())
    }

    pub fn effective_hold_threshold(&self) -> usize {
        self.hold_threshold
            .unwrap_or_else(|| self.policy.hold_threshold())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FingerReading {
    pub finger: Finger,
    /// `None` when the tip or joint landmark is missing.
    pub distance: Option<f32>,
    pub extended: bool,
}

/// The classifier's full output for one frame, verdict plus debug data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub readings: Vec<FingerReading>,
    pub open_fingers: usize,
    pub closed_fingers: usize,
    pub is_free: bool,
    pub is_hold: bool,
    pub hand_detected: bool,
    pub verdict: GestureVerdict,
}

impl Classification {
    pub fn no_hand() -> Self {
        Self {
            readings: Vec::new(),
            open_fingers: 0,
            closed_fingers: 0,
            is_free: false,
            is_hold: false,
            hand_detected: false,
            verdict: GestureVerdict::None,
        }
    }

    pub fn distances(&self) -> Vec<Option<f32>> {
        self.readings.iter().map(|r| r.distance).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FingerClassifier {
    config: ClassifierConfig,
}

impl FingerClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies one hand, or reports `None` when no hand was found.
    pub fn classify(&self, hand: Option<&HandLandmarks>) -> Classification {
        let Some(hand) = hand.filter(|h| !h.is_empty()) else {
            return Classification::no_hand();
        };

        let readings: Vec<FingerReading> = Finger::ALL
            .iter()
            .map(|&finger| {
                let distance = hand
                    .finger_points(finger)
                    .map(|(tip, joint)| tip.distance_to(joint));
                FingerReading {
                    finger,
                    distance,
                    extended: distance.is_some_and(|d| d > self.config.distance_threshold),
                }
            })
            .collect();

        let open_fingers = readings.iter().filter(|r| r.extended).count();
        let closed_fingers = Finger::ALL.len() - open_fingers;
        let is_free = open_fingers >= self.config.effective_free_threshold();
        let is_hold = closed_fingers >= self.config.effective_hold_threshold();

        // A truncated landmark list is reported but never drives the state machine.
        let verdict = if !hand.is_complete() {
            GestureVerdict::None
        } else if is_free {
            GestureVerdict::Free
        } else if is_hold {
            GestureVerdict::Hold
        } else {
            GestureVerdict::None
        };

        Classification {
            readings,
            open_fingers,
            closed_fingers,
            is_free,
            is_hold,
            hand_detected: true,
            verdict,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::{Landmark, LANDMARK_COUNT};

    /// Builds a full hand where finger `i` has tip-to-joint distance `distances[i]`,
    /// measured along the y axis.
    pub(crate) fn hand_with_distances(distances: [f32; 5]) -> HandLandmarks {
        let mut points = vec![Landmark::new(0.0, 0.0, 0.0); LANDMARK_COUNT];
        for (finger, distance) in Finger::ALL.iter().zip(distances) {
            let x = 100.0 * (finger.tip_index() as f32);
            points[finger.joint_index()] = Landmark::new(x, 200.0, 0.0);
            points[finger.tip_index()] = Landmark::new(x, 200.0 - distance, 0.0);
        }
        HandLandmarks::new(points)
    }

    pub(crate) fn open_hand() -> HandLandmarks {
        hand_with_distances([80.0; 5])
    }

    pub(crate) fn fist() -> HandLandmarks {
        hand_with_distances([10.0; 5])
    }

    #[test]
    fn no_hand_is_none() {
        let classifier = FingerClassifier::default();
        let result = classifier.classify(None);
        assert_eq!(result.verdict, GestureVerdict::None);
        assert!(!result.hand_detected);
        assert!(result.readings.is_empty());

        let empty = HandLandmarks::new(Vec::new());
        assert_eq!(classifier.classify(Some(&empty)).verdict, GestureVerdict::None);
    }

    #[test]
    fn open_hand_is_free_under_both_policies() {
        for policy in [GesturePolicy::Hold, GesturePolicy::Release] {
            let classifier = FingerClassifier::new(ClassifierConfig::with_policy(policy));
            let result = classifier.classify(Some(&open_hand()));
            assert_eq!(result.open_fingers, 5);
            assert_eq!(result.closed_fingers, 0);
            assert_eq!(result.verdict, GestureVerdict::Free);
        }
    }

    #[test]
    fn fist_is_hold_under_both_policies() {
        for policy in [GesturePolicy::Hold, GesturePolicy::Release] {
            let classifier = FingerClassifier::new(ClassifierConfig::with_policy(policy));
            let result = classifier.classify(Some(&fist()));
            assert_eq!(result.open_fingers, 0);
            assert_eq!(result.closed_fingers, 5);
            assert_eq!(result.verdict, GestureVerdict::Hold);
            assert!(!result.is_free);
        }
    }

    #[test]
    fn threshold_distance_counts_as_closed() {
        let classifier = FingerClassifier::default();
        let result = classifier.classify(Some(&hand_with_distances([50.0, 50.0, 50.0, 80.0, 80.0])));
        assert_eq!(result.open_fingers, 2);
        assert_eq!(result.closed_fingers, 3);
        assert!(result.readings[..3].iter().all(|r| !r.extended));
        assert_eq!(result.readings[0].distance, Some(50.0));
    }

    #[test]
    fn policies_disagree_on_two_open_fingers() {
        let hand = hand_with_distances([80.0, 80.0, 10.0, 10.0, 10.0]);

        let hold = FingerClassifier::new(ClassifierConfig::with_policy(GesturePolicy::Hold));
        let result = hold.classify(Some(&hand));
        assert!(result.is_free && result.is_hold);
        assert_eq!(result.verdict, GestureVerdict::Free);

        let release = FingerClassifier::new(ClassifierConfig::with_policy(GesturePolicy::Release));
        assert_eq!(release.classify(Some(&hand)).verdict, GestureVerdict::Hold);
    }

    #[test]
    fn threshold_overrides_take_precedence() {
        let config = ClassifierConfig {
            free_threshold: Some(5),
            hold_threshold: Some(1),
            ..ClassifierConfig::default()
        };
        let classifier = FingerClassifier::new(config);
        let result = classifier.classify(Some(&hand_with_distances([80.0, 80.0, 80.0, 80.0, 10.0])));
        assert_eq!(result.verdict, GestureVerdict::Hold);
    }

    #[test]
    fn distance_threshold_is_tunable() {
        let config = ClassifierConfig {
            distance_threshold: 100.0,
            ..ClassifierConfig::default()
        };
        let result = FingerClassifier::new(config).classify(Some(&open_hand()));
        assert_eq!(result.open_fingers, 0);
        assert_eq!(result.verdict, GestureVerdict::Hold);
    }

    #[test]
    fn truncated_hand_is_classified_without_panicking() {
        let mut hand = open_hand();
        hand.landmarks.truncate(13);
        let classifier = FingerClassifier::default();
        let result = classifier.classify(Some(&hand));
        assert_eq!(result.readings.len(), 5);
        assert_eq!(result.open_fingers, 3);
        assert_eq!(result.readings[3].distance, None);
        assert_eq!(result.readings[4].distance, None);
        assert_eq!(result.verdict, GestureVerdict::None);
        assert_eq!(classifier.classify(Some(&hand)), result);
    }

    #[test]
    fn classification_is_pure() {
        let classifier = FingerClassifier::default();
        let hand = hand_with_distances([12.0, 75.5, 49.9, 50.1, 3.0]);
        assert_eq!(classifier.classify(Some(&hand)), classifier.classify(Some(&hand)));
    }

    #[test]
    fn policy_uses_wire_names() {
        assert_eq!(serde_json::to_string(&GesturePolicy::Hold).unwrap(), "\"min2\"");
        assert_eq!(serde_json::to_string(&GesturePolicy::Release).unwrap(), "\"min3\"");
        let parsed: GesturePolicy = serde_json::from_str("\"release\"").unwrap();
        assert_eq!(parsed, GesturePolicy::Release);
    }
}
