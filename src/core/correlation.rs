//! Device co-occurrence correlation over quantized time slices.
//!
//! Local wall-clock time is cut into fixed slices aligned to multiples of the
//! slice width, so a 60 minute slice always runs from :00 to :00 on the local
//! clock. A device is active in a slice when one of its events starts there.
//! For each ordered pair `(a, b)` the probability is P(b active | a active),
//! so the pair `(b, a)` is a separate entry and may differ.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::rounding;
use crate::error::{AnalyticsError, Result};
use crate::ingest::UsageEvent;

/// Default slice width in minutes.
pub const DEFAULT_WINDOW_MINUTES: u32 = 30;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Conditional activation probability of `device_b` given `device_a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub device_a: String,
    pub device_b: String,
    #[serde(serialize_with = "rounding::serialize")]
    pub probability: f64,
}

/// Correlation output with the slice width it was computed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub window_minutes: u32,
    pub devices: Vec<String>,
    pub pairs: Vec<CorrelationPair>,
}

/// Validate a slice width: 1..=1440 minutes and a divisor of a day.
pub fn validate_window_minutes(window_minutes: u32) -> Result<()> {
    if window_minutes == 0 || window_minutes > MINUTES_PER_DAY {
        return Err(AnalyticsError::invalid_range(
            "window_minutes",
            format!("must be within 1..={MINUTES_PER_DAY}, got {window_minutes}"),
        ));
    }
    if MINUTES_PER_DAY % window_minutes != 0 {
        return Err(AnalyticsError::invalid_range(
            "window_minutes",
            format!("must divide a day evenly, got {window_minutes}"),
        ));
    }
    Ok(())
}

/// Slice index of an event's local start time.
fn slice_of(event: &UsageEvent, slice_secs: i64, tz: &Tz) -> i64 {
    let local = event.start_time().with_timezone(tz).naive_local();
    local.and_utc().timestamp().div_euclid(slice_secs)
}

/// Compute directional co-occurrence probabilities for every ordered pair of
/// devices in `events_by_device`, with slices cut on the clock of `tz`.
///
/// Pairs whose conditioning device never activates are omitted. The result
/// is sorted by probability descending, then by `(device_a, device_b)`.
pub fn correlate(
    events_by_device: &BTreeMap<String, Vec<UsageEvent>>,
    window_minutes: u32,
    tz: &Tz,
) -> Result<Vec<CorrelationPair>> {
    validate_window_minutes(window_minutes)?;
    let slice_secs = i64::from(window_minutes) * 60;

    let active: BTreeMap<&str, BTreeSet<i64>> = events_by_device
        .iter()
        .map(|(device, events)| {
            let slices = events.iter().map(|e| slice_of(e, slice_secs, tz)).collect();
            (device.as_str(), slices)
        })
        .collect();

    let mut pairs = Vec::new();
    for (device_a, slices_a) in &active {
        if slices_a.is_empty() {
            continue;
        }
        let active_a = slices_a.len() as f64;

        for (device_b, slices_b) in &active {
            if device_a == device_b {
                continue;
            }
            let both = slices_a.intersection(slices_b).count() as f64;
            pairs.push(CorrelationPair {
                device_a: (*device_a).to_string(),
                device_b: (*device_b).to_string(),
                probability: both / active_a,
            });
        }
    }

    sort_pairs(&mut pairs);

    tracing::debug!(
        devices = active.len(),
        window_minutes,
        timezone = tz.name(),
        pairs = pairs.len(),
        "computed device co-occurrence"
    );

    Ok(pairs)
}

/// Deterministic order: probability descending, then `(device_a, device_b)`.
pub fn sort_pairs(pairs: &mut [CorrelationPair]) {
    pairs.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.device_a.cmp(&b.device_a))
            .then_with(|| a.device_b.cmp(&b.device_b))
    });
}

/// Keep pairs above `min_probability` and return at most `k` of them, in
/// sorted order.
pub fn top_correlations(
    pairs: &[CorrelationPair],
    k: usize,
    min_probability: f64,
) -> Vec<CorrelationPair> {
    let mut kept: Vec<CorrelationPair> = pairs
        .iter()
        .filter(|p| p.probability > min_probability)
        .cloned()
        .collect();
    sort_pairs(&mut kept);
    kept.truncate(k);
    kept
}
