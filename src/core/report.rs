//! JSON report envelope for analytics results.
//!
//! Every result leaving the engine is wrapped with producer metadata, the
//! computation time and the timezone used for calendar alignment, so that a
//! stored report can be interpreted without the invocation that produced it.

use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current report format version.
pub const REPORT_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "smarthome-analytics";

/// Which analysis a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Usage,
    PeriodTotal,
    Histogram,
    Correlation,
    AlertDistribution,
    FeedbackResolution,
    AreaUsage,
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    /// Name of the producing software
    pub name: String,
    /// Version of the producing software
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// A computed analytics result with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport<T> {
    pub report_version: String,
    pub producer: Producer,
    /// When this payload was computed (RFC3339)
    pub computed_at_utc: String,
    /// IANA name of the timezone used for local-time alignment
    pub timezone: String,
    pub kind: ReportKind,
    pub payload: T,
}

/// Builder for report envelopes sharing one instance id.
pub struct ReportBuilder {
    instance_id: Uuid,
    timezone: Tz,
}

impl ReportBuilder {
    /// Create a builder with a fresh instance ID.
    pub fn new(timezone: Tz) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            timezone,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Wrap `payload` in a report envelope.
    pub fn build<T: Serialize>(&self, kind: ReportKind, payload: T) -> AnalyticsReport<T> {
        AnalyticsReport {
            report_version: REPORT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: self.instance_id.to_string(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            timezone: self.timezone.name().to_string(),
            kind,
            payload,
        }
    }

    /// Build and serialize a report as pretty-printed JSON.
    pub fn build_json<T: Serialize>(
        &self,
        kind: ReportKind,
        payload: T,
    ) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.build(kind, payload))
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}
