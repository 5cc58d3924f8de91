pub mod landmark_service;

pub use landmark_service::{BoxError, LandmarkService};
