pub mod processing_pipeline;
pub mod service;

pub use processing_pipeline::{GesturePipeline, GesturePipelineBuilder};
