use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog::CatalogRecord;
use crate::common::Frame;
use crate::error::SinkError;
use crate::pipeline::context::{ClassifiedState, FrameContext, SensingOutcome};
use crate::pipeline::domain::capture_state::{
    CaptureAction, CapturePhase, CaptureStateMachine, CaptureTiming,
};
use crate::pipeline::domain::gesture::{Classification, GestureVerdict};
use crate::sink::{CaptureReceipt, CaptureRequest, CaptureSink};

type CaptureResult = Result<CaptureReceipt, SinkError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum CaptureOutcome {
    Succeeded { summary: String },
    Failed { error: String },
}

impl CaptureOutcome {
    fn from_result(result: CaptureResult) -> Self {
        match result {
            Ok(receipt) => {
                info!("Capture completed: {}", receipt.describe());
                CaptureOutcome::Succeeded {
                    summary: receipt.describe(),
                }
            }
            Err(e) => {
                warn!("Capture failed: {}", e);
                CaptureOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Succeeded { .. })
    }
}

/// Human-readable status plus the debug fields shown alongside it.
///
/// Recomputed on every tick. The message wording is not stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub message: String,
    pub phase: &'static str,
    pub verdict: GestureVerdict,
    pub open_fingers: Option<usize>,
    pub closed_fingers: Option<usize>,
    pub distances: Vec<Option<f32>>,
    pub frame_id: Option<Uuid>,
    pub sensing_error: Option<String>,
    pub capture_in_flight: bool,
    pub captures_fired: u64,
    pub last_capture: Option<CaptureOutcome>,
}

impl Status {
    pub fn initial() -> Self {
        Self {
            message: "Waiting for first frame".to_string(),
            phase: CapturePhase::Idle.name(),
            verdict: GestureVerdict::None,
            open_fingers: None,
            closed_fingers: None,
            distances: Vec::new(),
            frame_id: None,
            sensing_error: None,
            capture_in_flight: false,
            captures_fired: 0,
            last_capture: None,
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    (duration.as_millis() as u64).div_ceil(1000)
}

/// Owns the capture session: the state machine, the selected target, and the
/// single capture that may be in flight.
pub struct CaptureController {
    machine: CaptureStateMachine,
    sink: Arc<dyn CaptureSink>,
    target: Option<CatalogRecord>,
    in_flight: Option<oneshot::Receiver<CaptureResult>>,
    last_outcome: Option<CaptureOutcome>,
    captures_fired: u64,
}

impl CaptureController {
    pub fn new(timing: CaptureTiming, sink: Arc<dyn CaptureSink>) -> Self {
        Self {
            machine: CaptureStateMachine::new(timing),
            sink,
            target: None,
            in_flight: None,
            last_outcome: None,
            captures_fired: 0,
        }
    }

    pub fn set_target(&mut self, target: Option<CatalogRecord>) {
        debug!(
            target = target.as_ref().map(|r| r.name.as_str()).unwrap_or("-"),
            "Capture target changed"
        );
        self.target = target;
    }

    pub fn target(&self) -> Option<&CatalogRecord> {
        self.target.as_ref()
    }

    pub fn phase(&self) -> CapturePhase {
        self.machine.phase()
    }

    pub fn captures_fired(&self) -> u64 {
        self.captures_fired
    }

    pub fn last_outcome(&self) -> Option<&CaptureOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn capture_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Back to `Idle` with no capture history. An in-flight capture still
    /// reports, and a gesture completed before it resolves is not captured
    /// but leaves the session armable instead of cooling.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.last_outcome = None;
    }

    pub fn tick(&mut self, now: Instant, context: &FrameContext<ClassifiedState>) -> Status {
        let sensing_error = match context.sensing() {
            SensingOutcome::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        self.advance(
            now,
            context.classification(),
            sensing_error,
            Some(context.shared_frame()),
        )
    }

    /// A tick where no frame could be grabbed; counts as "no hand".
    pub fn tick_without_frame(&mut self, now: Instant, reason: impl Into<String>) -> Status {
        self.advance(now, &Classification::no_hand(), Some(reason.into()), None)
    }

    /// Waits for the in-flight capture, if any, and records its outcome.
    pub async fn wait_for_capture(&mut self) -> Option<CaptureOutcome> {
        let receiver = self.in_flight.take()?;
        let outcome = CaptureOutcome::from_result(receiver.await.unwrap_or(Err(SinkError::Dropped)));
        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn poll_in_flight(&mut self) -> Option<CaptureOutcome> {
        let receiver = self.in_flight.as_mut()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(SinkError::Dropped),
        };
        self.in_flight = None;
        let outcome = CaptureOutcome::from_result(result);
        self.last_outcome = Some(outcome.clone());
        Some(outcome)
    }

    fn dispatch(&mut self, frame: Arc<Frame>) {
        let request = CaptureRequest {
            frame,
            target: self.target.clone(),
            fired_at: Utc::now(),
        };
        let sink = self.sink.clone();
        let (result_tx, result_rx) = oneshot::channel();
        let span = info_span!("capture", sink = sink.name(), frame = %request.frame.frame_id());
        tokio::spawn(
            async move {
                let result = sink.capture(request).await;
                let _ = result_tx.send(result);
            }
            .instrument(span),
        );
        self.in_flight = Some(result_rx);
        self.captures_fired += 1;
    }

    fn advance(
        &mut self,
        now: Instant,
        classification: &Classification,
        sensing_error: Option<String>,
        frame: Option<Arc<Frame>>,
    ) -> Status {
        let resolved = self.poll_in_flight();
        let frame_id = frame.as_ref().map(|frame| frame.frame_id());
        let action = self.machine.tick(now, classification.verdict);

        let message = match action {
            CaptureAction::Fire => match frame {
                Some(frame) if self.in_flight.is_none() => {
                    self.dispatch(frame);
                    "Capturing...".to_string()
                }
                Some(_) => {
                    warn!("Previous capture still in flight, not starting another");
                    self.machine.withdraw_fire();
                    "Previous capture still in progress".to_string()
                }
                // Fire needs a Hold verdict, and a Hold verdict needs a frame.
                None => "No frame to capture".to_string(),
            },
            CaptureAction::Cooling { remaining } => match &resolved {
                Some(CaptureOutcome::Succeeded { summary }) => format!(
                    "{}! Next capture available in {} seconds",
                    summary,
                    ceil_secs(remaining)
                ),
                Some(CaptureOutcome::Failed { .. }) => "Error saving capture".to_string(),
                None => format!(
                    "Please wait {} seconds before next capture",
                    ceil_secs(remaining)
                ),
            },
            CaptureAction::Dwelling { remaining } => {
                format!("Keep hand open for {} more seconds", ceil_secs(remaining))
            }
            CaptureAction::Armed | CaptureAction::AwaitingHold => {
                "Open hand detected - make a hold gesture to capture".to_string()
            }
            CaptureAction::Disarmed => "Hand lost - show open hand to start".to_string(),
            CaptureAction::Idle { hand_visible: true } => "Show open hand to start".to_string(),
            CaptureAction::Idle {
                hand_visible: false,
            } => {
                if sensing_error.is_some() {
                    "Hand tracking unavailable".to_string()
                } else if classification.hand_detected {
                    "Hand not fully visible".to_string()
                } else {
                    "No hand detected".to_string()
                }
            }
        };

        let (open_fingers, closed_fingers) = if classification.hand_detected {
            (
                Some(classification.open_fingers),
                Some(classification.closed_fingers),
            )
        } else {
            (None, None)
        };

        Status {
            message,
            phase: self.machine.phase().name(),
            verdict: classification.verdict,
            open_fingers,
            closed_fingers,
            distances: classification.distances(),
            frame_id,
            sensing_error,
            capture_in_flight: self.in_flight.is_some(),
            captures_fired: self.captures_fired,
            last_capture: self.last_outcome.clone(),
        }
    }
}
