//! Input boundary for the analytics engine.
//!
//! This module provides the typed records the persistence layer hands to the
//! engine, and loaders for JSON / JSON Lines exports of those records.

pub mod loader;
pub mod types;

// Re-export commonly used types
pub use loader::{load_records, load_usage_events, parse_records, IngestError};
pub use types::{
    group_by_device, AlertRecord, DeviceRecord, FeedbackRecord, HomeRecord, RecordError,
    UsageEvent,
};
