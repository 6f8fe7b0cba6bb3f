//! Smart-home usage analytics - usage aggregation and device correlation.
//!
//! This library turns device usage events, alerts and feedback records into
//! time-bucketed usage, time-of-day histograms, device co-occurrence
//! probabilities and category distributions.
//!
//! # Guarantees
//!
//! - **Pure**: every analysis is a synchronous function of its inputs
//! - **Deterministic**: ties are broken by explicit orderings, never by hash order
//! - **Timezone-aware**: day and week boundaries follow a configured IANA timezone
//! - **Total**: empty input yields zero-filled or empty results, never an error
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Smart-Home Analytics                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Ingest    │──▶│  Windowing  │──▶│  Buckets /  │       │
//! │  │ (JSON/JSONL)│   │ (local tz)  │   │  Histogram  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Correlation │   │Distribution │──▶│   Report    │       │
//! │  │  (slices)   │   │  / Area     │   │  Envelope   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use chrono_tz::Tz;
//! use smarthome_analytics::core::{aggregate_usage, Granularity};
//! use smarthome_analytics::ingest::UsageEvent;
//!
//! let start = Utc.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap();
//! let events = vec![UsageEvent::new("lamp", start, 5400.0).unwrap()];
//!
//! let reference = Utc.with_ymd_and_hms(2025, 3, 12, 20, 0, 0).unwrap().with_timezone(&Tz::UTC);
//! let result = aggregate_usage(&events, reference, 7, Granularity::Day).unwrap();
//! assert_eq!(result.buckets.len(), 7);
//! assert_eq!(result.buckets[6].total_hours, 1.5);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod logging;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    aggregate_usage, build_histogram, correlate, summarize_distribution, AnalyticsReport,
    ReportBuilder,
};
pub use error::{AnalyticsError, Result};
pub use ingest::{IngestError, UsageEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert!(!VERSION.is_empty());
        assert_eq!(crate::core::PRODUCER_NAME, env!("CARGO_PKG_NAME"));
    }
}
