//! The timed state machine that decides when a capture fires.
//!
//! A capture needs a `Free` observation followed, at least `dwell` later, by a
//! `Hold` observation with no `None` in between. After firing, no capture is
//! allowed for `cooldown`.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::pipeline::domain::gesture::GestureVerdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureTiming {
    /// Minimum time between entering `Armed` and a qualifying `Hold`.
    #[serde(with = "millis")]
    pub dwell: Duration,
    /// Minimum time after a capture before the next one may fire.
    #[serde(with = "millis")]
    pub cooldown: Duration,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(3000),
            cooldown: Duration::from_millis(10000),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Armed { since: Instant },
    Cooling { until: Instant },
}

impl CapturePhase {
    pub fn name(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Armed { .. } => "armed",
            CapturePhase::Cooling { .. } => "cooling",
        }
    }
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureAction {
    /// Nothing qualifying is happening.
    Idle { hand_visible: bool },
    /// `Free` was just observed; dwell starts now.
    Armed,
    /// Still armed, waiting for a `Hold`.
    AwaitingHold,
    /// A `Hold` arrived before the dwell elapsed.
    Dwelling { remaining: Duration },
    /// Invoke the capture sink exactly once.
    Fire,
    /// Captures are suppressed until the cooldown ends.
    Cooling { remaining: Duration },
    /// The hand disappeared while armed.
    Disarmed,
}

/// Capture session state. Owned by one controller and mutated only by [`tick`].
///
/// [`tick`]: CaptureStateMachine::tick
#[derive(Debug, Clone)]
pub struct CaptureStateMachine {
    timing: CaptureTiming,
    phase: CapturePhase,
    last_capture_at: Option<Instant>,
    previous_capture_at: Option<Instant>,
}

impl CaptureStateMachine {
    pub fn new(timing: CaptureTiming) -> Self {
        Self {
            timing,
            phase: CapturePhase::Idle,
            last_capture_at: None,
            previous_capture_at: None,
        }
    }

    pub fn timing(&self) -> &CaptureTiming {
        &self.timing
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn last_capture_at(&self) -> Option<Instant> {
        self.last_capture_at
    }

    pub fn reset(&mut self) {
        debug!("Capture state reset");
        self.phase = CapturePhase::Idle;
        self.last_capture_at = None;
        self.previous_capture_at = None;
    }

    /// Undoes the most recent `Fire` when the capture could not be started.
    ///
    /// The machine returns to `Idle` without a cooldown, so the next
    /// `Free -> Hold` sequence can fire again.
    pub fn withdraw_fire(&mut self) {
        if let CapturePhase::Cooling { .. } = self.phase {
            debug!("Capture withdrawn, cooldown cancelled");
            self.phase = CapturePhase::Idle;
            self.last_capture_at = self.previous_capture_at;
        }
    }

    pub fn tick(&mut self, now: Instant, verdict: GestureVerdict) -> CaptureAction {
        if let CapturePhase::Cooling { until } = self.phase {
            if now < until {
                return CaptureAction::Cooling {
                    remaining: until - now,
                };
            }
            debug!("Cooldown elapsed");
            self.phase = CapturePhase::Idle;
        }

        match (self.phase, verdict) {
            (CapturePhase::Idle, GestureVerdict::Free) => {
                info!("Free hand observed, arming capture");
                self.phase = CapturePhase::Armed { since: now };
                CaptureAction::Armed
            }
            (CapturePhase::Idle, GestureVerdict::Hold) => CaptureAction::Idle { hand_visible: true },
            (CapturePhase::Idle, GestureVerdict::None) => CaptureAction::Idle {
                hand_visible: false,
            },
            (CapturePhase::Armed { .. }, GestureVerdict::Free) => CaptureAction::AwaitingHold,
            (CapturePhase::Armed { since }, GestureVerdict::Hold) => {
                let dwelled = now.saturating_duration_since(since);
                if dwelled >= self.timing.dwell {
                    info!(dwell_ms = dwelled.as_millis() as u64, "Hold after dwell, firing capture");
                    self.phase = CapturePhase::Cooling {
                        until: now + self.timing.cooldown,
                    };
                    self.previous_capture_at = self.last_capture_at.replace(now);
                    CaptureAction::Fire
                } else {
                    CaptureAction::Dwelling {
                        remaining: self.timing.dwell - dwelled,
                    }
                }
            }
            (CapturePhase::Armed { .. }, GestureVerdict::None) => {
                debug!("Hand lost while armed");
                self.phase = CapturePhase::Idle;
                CaptureAction::Disarmed
            }
            // Cooling has been resolved above.
            (CapturePhase::Cooling { until }, _) => CaptureAction::Cooling {
                remaining: until.saturating_duration_since(now),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GestureVerdict::{Free, Hold, None as NoHand};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn machine(dwell: u64, cooldown: u64) -> CaptureStateMachine {
        CaptureStateMachine::new(CaptureTiming {
            dwell: ms(dwell),
            cooldown: ms(cooldown),
        })
    }

    /// Feeds `(offset_ms, verdict)` pairs and returns the offsets at which a capture fired.
    fn fire_times(machine: &mut CaptureStateMachine, steps: &[(u64, GestureVerdict)]) -> Vec<u64> {
        let start = Instant::now();
        steps
            .iter()
            .filter_map(|&(offset, verdict)| {
                (machine.tick(start + ms(offset), verdict) == CaptureAction::Fire).then_some(offset)
            })
            .collect()
    }

    #[test]
    fn free_then_hold_after_dwell_fires() {
        let mut m = machine(1000, 5000);
        assert_eq!(fire_times(&mut m, &[(0, Free), (1100, Hold)]), vec![1100]);
        assert!(matches!(m.phase(), CapturePhase::Cooling { .. }));
        assert!(m.last_capture_at().is_some());
    }

    #[test]
    fn hold_before_dwell_reports_remaining_time() {
        let mut m = machine(3000, 5000);
        let start = Instant::now();
        assert_eq!(m.tick(start, Free), CaptureAction::Armed);
        assert_eq!(
            m.tick(start + ms(1000), Hold),
            CaptureAction::Dwelling { remaining: ms(2000) }
        );
        assert_eq!(m.phase(), CapturePhase::Armed { since: start });
        assert_eq!(m.tick(start + ms(3000), Hold), CaptureAction::Fire);
    }

    #[test]
    fn continued_free_keeps_original_arm_time() {
        let mut m = machine(1000, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        assert_eq!(m.tick(start + ms(500), Free), CaptureAction::AwaitingHold);
        assert_eq!(m.phase(), CapturePhase::Armed { since: start });
        assert_eq!(m.tick(start + ms(1000), Hold), CaptureAction::Fire);
    }

    #[test]
    fn bare_hold_while_idle_is_ignored() {
        let mut m = machine(0, 5000);
        assert!(fire_times(&mut m, &[(0, Hold), (2000, Hold), (4000, Hold)]).is_empty());
        assert_eq!(m.phase(), CapturePhase::Idle);
    }

    #[test]
    fn losing_the_hand_disarms() {
        let mut m = machine(1000, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        assert_eq!(m.tick(start + ms(500), NoHand), CaptureAction::Disarmed);
        assert_eq!(m.phase(), CapturePhase::Idle);
        assert!(fire_times(&mut m, &[(1500, Hold)]).is_empty());
    }

    #[test]
    fn intervening_none_prevents_fire() {
        let mut m = machine(1000, 5000);
        assert!(fire_times(&mut m, &[(0, Free), (600, NoHand), (1200, Hold)]).is_empty());
    }

    #[test]
    fn cooldown_suppresses_second_capture() {
        let mut m = machine(1000, 5000);
        let fired = fire_times(
            &mut m,
            &[
                (0, Free),
                (1000, Hold),
                // second sequence completing inside the cooldown
                (1500, Free),
                (2000, Free),
                (4000, Hold),
                // after the cooldown
                (6000, Free),
                (7000, Hold),
            ],
        );
        assert_eq!(fired, vec![1000, 7000]);
    }

    #[test]
    fn cooling_reports_remaining_regardless_of_verdict() {
        let mut m = machine(0, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        assert_eq!(m.tick(start, Hold), CaptureAction::Fire);
        for verdict in [Free, Hold, NoHand] {
            assert_eq!(
                m.tick(start + ms(2000), verdict),
                CaptureAction::Cooling { remaining: ms(3000) }
            );
        }
    }

    #[test]
    fn cooldown_expiry_processes_the_current_verdict() {
        let mut m = machine(0, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        m.tick(start, Hold);
        assert_eq!(m.tick(start + ms(5000), Free), CaptureAction::Armed);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut m = machine(0, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        m.tick(start, Hold);
        m.reset();
        assert_eq!(m.phase(), CapturePhase::Idle);
        assert_eq!(m.last_capture_at(), None);
        assert_eq!(m.tick(start + ms(10), Free), CaptureAction::Armed);
    }

    #[test]
    fn withdrawn_fire_skips_the_cooldown() {
        let mut m = machine(0, 5000);
        let start = Instant::now();
        m.tick(start, Free);
        assert_eq!(m.tick(start, Hold), CaptureAction::Fire);
        m.withdraw_fire();
        assert_eq!(m.phase(), CapturePhase::Idle);
        assert_eq!(m.last_capture_at(), None);
        assert_eq!(m.tick(start + ms(10), Free), CaptureAction::Armed);
        assert_eq!(m.tick(start + ms(10), Hold), CaptureAction::Fire);
        assert_eq!(m.last_capture_at(), Some(start + ms(10)));
    }

    #[test]
    fn timing_deserializes_from_millis() {
        let timing: CaptureTiming = serde_json::from_str(r#"{"dwell": 1000, "cooldown": 5000}"#).unwrap();
        assert_eq!(timing.dwell, ms(1000));
        assert_eq!(timing.cooldown, ms(5000));
    }
}
