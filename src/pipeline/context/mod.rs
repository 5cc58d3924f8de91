pub mod frame_context;
pub mod metrics;
pub mod state;

pub use frame_context::{FrameContext, SensingOutcome};
pub use metrics::FrameMetrics;
pub use state::{ClassifiedState, IngestedState, ProcessingState};
