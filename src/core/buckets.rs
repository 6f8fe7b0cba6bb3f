//! Daily and weekly usage buckets anchored at a reference time.
//!
//! Buckets are contiguous and ordered oldest to newest. An event is
//! attributed in full to the bucket containing its start time; events that
//! run across a boundary are not split.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::rounding;
use crate::core::windowing::{local_midnight, week_start};
use crate::error::{AnalyticsError, Result};
use crate::ingest::UsageEvent;

/// Width of an aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
}

impl FromStr for Granularity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            other => Err(AnalyticsError::invalid_range(
                "granularity",
                format!("expected day|week, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
        }
    }
}

/// Usage aggregated over one half-open interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    /// Display label (`MM-DD` for days, `MM-DD~MM-DD` for weeks)
    pub label: String,
    /// Inclusive start of the bucket
    pub interval_start: DateTime<Utc>,
    /// Exclusive end of the bucket
    pub interval_end: DateTime<Utc>,
    /// Total usage attributed to this bucket
    #[serde(serialize_with = "rounding::serialize")]
    pub total_hours: f64,
    /// Number of events attributed to this bucket
    pub event_count: usize,
}

impl TimeBucket {
    fn empty(label: String, interval_start: DateTime<Utc>, interval_end: DateTime<Utc>) -> Self {
        Self {
            label,
            interval_start,
            interval_end,
            total_hours: 0.0,
            event_count: 0,
        }
    }

    /// Check if a timestamp falls within this bucket.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.interval_start && timestamp < self.interval_end
    }
}

/// Output of [`aggregate_usage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketResult {
    pub granularity: Granularity,
    pub buckets: Vec<TimeBucket>,
    /// Sum over all buckets
    #[serde(serialize_with = "rounding::serialize")]
    pub total_hours: f64,
    /// Arithmetic mean of `total_hours` across buckets
    #[serde(serialize_with = "rounding::serialize")]
    pub average_hours: f64,
}

/// Build the `period_count` empty buckets ending with the one containing
/// `reference`, in the reference's timezone.
pub fn bucket_intervals(
    reference: DateTime<Tz>,
    period_count: usize,
    granularity: Granularity,
) -> Result<Vec<TimeBucket>> {
    if period_count == 0 {
        return Err(AnalyticsError::invalid_range(
            "period_count",
            "must be at least 1",
        ));
    }

    let tz = reference.timezone();
    let anchor = match granularity {
        Granularity::Day => reference.date_naive(),
        Granularity::Week => week_start(reference.date_naive()),
    };
    let step_days: u64 = match granularity {
        Granularity::Day => 1,
        Granularity::Week => 7,
    };

    // The oldest bucket must be representable before any bucket is built.
    let span_days = u64::try_from(period_count - 1)
        .ok()
        .and_then(|n| n.checked_mul(step_days))
        .ok_or_else(|| {
            AnalyticsError::invalid_range("period_count", format!("{period_count} is too large"))
        })?;
    shift_back(anchor, span_days)?;

    (0..period_count)
        .map(|i| {
            let periods_back = (period_count - 1 - i) as u64;
            let first_day = shift_back(anchor, periods_back * step_days)?;
            let next_start = shift_forward(first_day, step_days)?;

            let label = match granularity {
                Granularity::Day => first_day.format("%m-%d").to_string(),
                Granularity::Week => {
                    let last_day = shift_forward(first_day, step_days - 1)?;
                    format!("{}~{}", first_day.format("%m-%d"), last_day.format("%m-%d"))
                }
            };

            Ok(TimeBucket::empty(
                label,
                local_midnight(&tz, first_day),
                local_midnight(&tz, next_start),
            ))
        })
        .collect()
}

fn shift_back(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days)).ok_or_else(|| {
        AnalyticsError::invalid_range("period_count", "reaches before the supported calendar")
    })
}

fn shift_forward(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days)).ok_or_else(|| {
        AnalyticsError::invalid_range("reference_time", "reaches past the supported calendar")
    })
}

/// Aggregate usage into the last `period_count` day or week buckets.
///
/// Always returns exactly `period_count` buckets; buckets with no events
/// have `total_hours == 0`.
pub fn aggregate_usage(
    events: &[UsageEvent],
    reference: DateTime<Tz>,
    period_count: usize,
    granularity: Granularity,
) -> Result<BucketResult> {
    let mut buckets = bucket_intervals(reference, period_count, granularity)?;
    let mut seconds = vec![0.0_f64; buckets.len()];
    let mut skipped = 0usize;

    for event in events {
        let start = event.start_time();
        // Buckets are sorted and contiguous: find the last one starting at or before `start`.
        let idx = buckets.partition_point(|b| b.interval_start <= start);
        match idx.checked_sub(1) {
            Some(i) if buckets[i].contains(start) => {
                seconds[i] += event.duration_secs();
                buckets[i].event_count += 1;
            }
            _ => skipped += 1,
        }
    }

    for (bucket, secs) in buckets.iter_mut().zip(&seconds) {
        bucket.total_hours = secs / 3600.0;
    }

    let total_hours: f64 = buckets.iter().map(|b| b.total_hours).sum();
    let average_hours = if buckets.is_empty() {
        0.0
    } else {
        total_hours / buckets.len() as f64
    };

    tracing::debug!(
        %granularity,
        period_count,
        events = events.len(),
        skipped,
        total_hours,
        "aggregated usage buckets"
    );

    Ok(BucketResult {
        granularity,
        buckets,
        total_hours,
        average_hours,
    })
}

/// Rolling period for [`period_total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePeriod {
    /// Since local midnight of the reference day
    Day,
    /// Trailing 7 days
    Week,
    /// Trailing 30 days
    Month,
    /// Trailing 365 days
    Year,
}

impl FromStr for UsagePeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(AnalyticsError::invalid_range(
                "period",
                format!("expected day|week|month|year, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(name)
    }
}

/// Total usage over a rolling period ending at the reference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub period: UsagePeriod,
    /// Inclusive start of the period
    pub since: DateTime<Utc>,
    /// Inclusive end of the period (the reference time)
    pub until: DateTime<Utc>,
    #[serde(serialize_with = "rounding::serialize")]
    pub total_seconds: f64,
    #[serde(serialize_with = "rounding::serialize")]
    pub total_hours: f64,
    pub event_count: usize,
}

/// Sum usage of events starting in `[since, reference]` for `period`.
pub fn period_total(
    events: &[UsageEvent],
    reference: DateTime<Tz>,
    period: UsagePeriod,
) -> PeriodTotal {
    let until = reference.with_timezone(&Utc);
    let since = match period {
        UsagePeriod::Day => local_midnight(&reference.timezone(), reference.date_naive()),
        UsagePeriod::Week => until - Duration::days(7),
        UsagePeriod::Month => until - Duration::days(30),
        UsagePeriod::Year => until - Duration::days(365),
    };

    let (total_seconds, event_count) = events
        .iter()
        .filter(|e| e.start_time() >= since && e.start_time() <= until)
        .fold((0.0, 0usize), |(secs, n), e| (secs + e.duration_secs(), n + 1));

    tracing::debug!(%period, event_count, total_seconds, "computed period total");

    PeriodTotal {
        period,
        since,
        until,
        total_seconds,
        total_hours: total_seconds / 3600.0,
        event_count,
    }
}
