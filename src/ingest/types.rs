//! Typed input records supplied by the persistence layer.
//!
//! Only the fields the analytics engine reads are modelled. Unknown fields in
//! input files are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reasons a record is rejected at the ingest boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl RecordError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// One period of device usage.
///
/// Immutable once constructed: the duration is known to be finite and
/// non-negative and the device id is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UsageEventRecord")]
pub struct UsageEvent {
    device_id: String,
    start_time: DateTime<Utc>,
    duration_secs: f64,
}

impl UsageEvent {
    pub fn new(
        device_id: impl Into<String>,
        start_time: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<Self, RecordError> {
        let device_id = device_id.into();
        if device_id.trim().is_empty() {
            return Err(RecordError::invalid("device_id", "must not be empty"));
        }
        if !duration_secs.is_finite() {
            return Err(RecordError::invalid("duration_secs", "must be finite"));
        }
        if duration_secs < 0.0 {
            return Err(RecordError::invalid(
                "duration_secs",
                format!("must not be negative, got {duration_secs}"),
            ));
        }

        Ok(Self {
            device_id,
            start_time,
            duration_secs,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_secs / 3600.0
    }
}

/// Wire shape of a usage event before validation.
#[derive(Debug, Clone, Deserialize)]
struct UsageEventRecord {
    device_id: String,
    start_time: DateTime<Utc>,
    #[serde(alias = "duration_seconds")]
    duration_secs: f64,
}

impl TryFrom<UsageEventRecord> for UsageEvent {
    type Error = RecordError;

    fn try_from(record: UsageEventRecord) -> Result<Self, Self::Error> {
        UsageEvent::new(record.device_id, record.start_time, record.duration_secs)
    }
}

/// A device installed in a home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub home_id: String,
    pub device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A home with its floor area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeRecord {
    pub home_id: String,
    /// Floor area in square metres
    pub area_sqm: f64,
}

/// A system or security alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(default)]
    pub home_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    pub alert_type: String,
    /// Type of the device that raised the alert, when known
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

/// User feedback about a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub device_id: Option<String>,
    pub device_type: String,
    #[serde(default)]
    pub resolved: bool,
}

/// Group events by device id, preserving input order within each device.
pub fn group_by_device(events: &[UsageEvent]) -> BTreeMap<String, Vec<UsageEvent>> {
    let mut grouped: BTreeMap<String, Vec<UsageEvent>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.device_id().to_string())
            .or_default()
            .push(event.clone());
    }
    grouped
}
