//! Core analytics engine.
//!
//! This module contains:
//! - Window management and calendar alignment in a configured timezone
//! - Day/week bucket aggregation and rolling period totals
//! - Time-of-day histograms
//! - Device co-occurrence correlation
//! - Category distributions for alerts and feedback
//! - Area/usage relationship analysis
//! - Report envelopes for export

pub mod area;
pub mod buckets;
pub mod correlation;
pub mod distribution;
pub mod histogram;
pub mod report;
pub mod rounding;
pub mod windowing;

// Re-export commonly used types
pub use area::{
    area_usage_correlation, home_usage_samples, AreaUsageReport, HomeUsageSample, Trend,
    ValueRange,
};
pub use buckets::{
    aggregate_usage, bucket_intervals, period_total, BucketResult, Granularity, PeriodTotal,
    TimeBucket, UsagePeriod,
};
pub use correlation::{
    correlate, top_correlations, CorrelationPair, CorrelationReport, DEFAULT_WINDOW_MINUTES,
};
pub use distribution::{
    summarize_distribution, summarize_with_resolution, CategoryStat, DistributionSummary,
    ResolutionSummary,
};
pub use histogram::{build_histogram, HistogramResult, TimeSlot, SLOT_COUNT};
pub use report::{AnalyticsReport, ReportBuilder, ReportKind, PRODUCER_NAME, REPORT_VERSION};
pub use windowing::{local_midnight, week_start, ObservationWindow};
