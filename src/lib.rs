pub mod catalog;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod sensing;
pub mod sink;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder, LoopStatsSnapshot};
pub use error::{AppError, CatalogError, ConfigError, SensingError, SinkError};
pub use pipeline::controller::{CaptureOutcome, Status};
