pub mod capture_state;
pub mod gesture;

pub use capture_state::{CaptureAction, CapturePhase, CaptureStateMachine, CaptureTiming};
pub use gesture::{
    Classification, ClassifierConfig, FingerClassifier, FingerReading, GesturePolicy,
    GestureVerdict,
};
