//! The record model behind the capture sinks, and an in-memory store that
//! applies the same validation and upsert rules as the remote backend.

pub mod record;
pub mod store;

pub use record::{CatalogRecord, CreatureType};
pub use store::{CatalogStore, ScreenshotInfo, ScreenshotStore, StoredRecord};
