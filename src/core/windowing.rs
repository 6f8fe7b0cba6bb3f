//! Time windows and calendar alignment.
//!
//! All windows are half-open `[start, end)`. Calendar alignment (local
//! midnight, Monday week starts) is computed in a caller-supplied timezone.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// A bounded span of history an analysis operates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    /// Inclusive start of the window
    pub start: DateTime<Utc>,
    /// Exclusive end of the window
    pub end: DateTime<Utc>,
}

impl ObservationWindow {
    /// Create a window, rejecting empty or inverted spans.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(AnalyticsError::invalid_range(
                "observation_window",
                format!("end {end} must be after start {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(AnalyticsError::invalid_range(
                "days",
                "must be at least 1",
            ));
        }
        Self::new(end - Duration::days(i64::from(days)), end)
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Get the duration of this window in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Get the duration of this window in (fractional) days.
    pub fn duration_days(&self) -> f64 {
        self.duration_secs() / 86_400.0
    }
}

/// The first instant of `date` in `tz`.
///
/// An ambiguous midnight (clocks turned back) resolves to the earlier
/// instant. A skipped midnight resolves to the first valid local time after
/// it.
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    let mut candidate = naive;
    // Transitions never skip more than a few hours.
    for _ in 0..4 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(30),
        }
    }
    Utc.from_utc_datetime(&naive)
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The local calendar date of an instant.
pub fn local_date(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}
