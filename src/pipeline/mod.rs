pub mod context;
pub mod controller;
pub mod domain;
pub mod orchestration;

pub use controller::{CaptureController, CaptureOutcome, Status};
pub use domain::{
    CaptureAction, CapturePhase, CaptureStateMachine, CaptureTiming, Classification,
    ClassifierConfig, FingerClassifier, GesturePolicy, GestureVerdict,
};
pub use orchestration::{GesturePipeline, GesturePipelineBuilder};
