pub mod frame;
pub mod landmarks;

pub use frame::Frame;
pub use landmarks::{Finger, HandLandmarks, Landmark, LANDMARK_COUNT};
