//! Sensor reading domain model and storage.

pub mod store;
pub mod types;

// Re-export commonly used types
pub use store::{load_csv, ReadingStore, StoreError};
pub use types::{ParseSourceError, Reading, Source};
