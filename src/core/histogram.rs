//! Time-of-day usage histogram with twelve 2-hour slots.

use chrono::Timelike;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::rounding;
use crate::core::windowing::ObservationWindow;
use crate::ingest::UsageEvent;

/// Number of slots in a day.
pub const SLOT_COUNT: usize = 12;

/// Width of each slot in hours.
pub const SLOT_HOURS: u32 = 2;

/// Usage falling into one 2-hour slot of the day, across all dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub index: usize,
    /// e.g. `08:00-10:00`
    pub label: String,
    #[serde(serialize_with = "rounding::serialize")]
    pub total_hours: f64,
    pub event_count: usize,
}

/// Output of [`build_histogram`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramResult {
    pub window: ObservationWindow,
    pub slots: Vec<TimeSlot>,
    /// Smallest index holding the maximum `total_hours`
    pub peak_index: usize,
    pub peak_label: String,
    #[serde(serialize_with = "rounding::serialize")]
    pub total_hours: f64,
}

impl HistogramResult {
    pub fn peak_slot(&self) -> &TimeSlot {
        &self.slots[self.peak_index]
    }
}

/// Label for slot `index`, e.g. `22:00-24:00`.
pub fn slot_label(index: usize) -> String {
    let start = index as u32 * SLOT_HOURS;
    format!("{:02}:00-{:02}:00", start, start + SLOT_HOURS)
}

/// Slot index for a local hour of day.
pub fn slot_for_hour(hour: u32) -> usize {
    (hour / SLOT_HOURS) as usize
}

/// Build the time-of-day histogram for events starting inside `window`.
///
/// Hours of day are taken in `tz`. Each event's whole duration goes to the
/// slot of its start hour.
pub fn build_histogram(events: &[UsageEvent], window: &ObservationWindow, tz: &Tz) -> HistogramResult {
    let mut seconds = [0.0_f64; SLOT_COUNT];
    let mut counts = [0usize; SLOT_COUNT];

    for event in events.iter().filter(|e| window.contains(e.start_time())) {
        let hour = event.start_time().with_timezone(tz).hour();
        let slot = slot_for_hour(hour);
        seconds[slot] += event.duration_secs();
        counts[slot] += 1;
    }

    let slots: Vec<TimeSlot> = (0..SLOT_COUNT)
        .map(|index| TimeSlot {
            index,
            label: slot_label(index),
            total_hours: seconds[index] / 3600.0,
            event_count: counts[index],
        })
        .collect();

    // Strict comparison keeps the first index on ties.
    let peak_index = slots
        .iter()
        .enumerate()
        .fold(0, |best, (i, slot)| {
            if slot.total_hours > slots[best].total_hours {
                i
            } else {
                best
            }
        });
    let total_hours: f64 = slots.iter().map(|s| s.total_hours).sum();

    tracing::debug!(
        events = events.len(),
        included = counts.iter().sum::<usize>(),
        peak_index,
        total_hours,
        "built time-slot histogram"
    );

    HistogramResult {
        window: *window,
        peak_label: slot_label(peak_index),
        slots,
        peak_index,
        total_hours,
    }
}
