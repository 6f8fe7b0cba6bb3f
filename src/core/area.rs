//! Relationship between home floor area and daily device usage.
//!
//! Each home contributes one sample: its area and the average daily hours of
//! one device type over an observation window. The samples are then reduced
//! to a Pearson correlation coefficient and a coarse trend.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};

use crate::core::rounding;
use crate::core::windowing::ObservationWindow;
use crate::ingest::{DeviceRecord, HomeRecord, UsageEvent};

/// One home's area paired with its usage of a device type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeUsageSample {
    pub home_id: String,
    pub area_sqm: f64,
    #[serde(serialize_with = "rounding::serialize")]
    pub avg_daily_hours: f64,
}

/// Strength and direction of the area/usage relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongPositive,
    ModeratePositive,
    WeakPositive,
    None,
    WeakNegative,
    ModerateNegative,
    StrongNegative,
}

impl Trend {
    pub fn from_coefficient(r: Option<f64>) -> Self {
        let Some(r) = r else {
            return Trend::None;
        };
        let magnitude = r.abs();
        match (magnitude, r >= 0.0) {
            (m, true) if m >= 0.7 => Trend::StrongPositive,
            (m, true) if m >= 0.4 => Trend::ModeratePositive,
            (m, true) if m >= 0.2 => Trend::WeakPositive,
            (m, false) if m >= 0.7 => Trend::StrongNegative,
            (m, false) if m >= 0.4 => Trend::ModerateNegative,
            (m, false) if m >= 0.2 => Trend::WeakNegative,
            _ => Trend::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    fn of(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        Some(values.iter().fold(
            ValueRange {
                min: first,
                max: first,
            },
            |range, &v| ValueRange {
                min: range.min.min(v),
                max: range.max.max(v),
            },
        ))
    }
}

/// Output of [`area_usage_correlation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaUsageReport {
    pub samples: Vec<HomeUsageSample>,
    #[serde(serialize_with = "rounding::serialize_option")]
    pub correlation_coefficient: Option<f64>,
    pub trend: Trend,
    pub area_range: Option<ValueRange>,
    pub usage_range: Option<ValueRange>,
}

/// Build one sample per home that owns at least one device of `device_type`.
///
/// Usage is the total hours of that type's events starting inside `window`,
/// divided by the window length in days. Samples are ordered by home id.
pub fn home_usage_samples(
    homes: &[HomeRecord],
    devices: &[DeviceRecord],
    events: &[UsageEvent],
    device_type: &str,
    window: &ObservationWindow,
) -> Vec<HomeUsageSample> {
    // device id -> owning home, restricted to the requested type
    let owners: HashMap<&str, &str> = devices
        .iter()
        .filter(|d| d.device_type == device_type)
        .map(|d| (d.device_id.as_str(), d.home_id.as_str()))
        .collect();

    let mut hours_by_home: BTreeMap<&str, f64> = BTreeMap::new();
    for &home in owners.values() {
        hours_by_home.entry(home).or_insert(0.0);
    }
    for event in events.iter().filter(|e| window.contains(e.start_time())) {
        if let Some(&home) = owners.get(event.device_id()) {
            *hours_by_home.entry(home).or_insert(0.0) += event.duration_hours();
        }
    }

    let days = window.duration_days();
    let areas: HashMap<&str, f64> = homes
        .iter()
        .map(|h| (h.home_id.as_str(), h.area_sqm))
        .collect();

    let samples: Vec<HomeUsageSample> = hours_by_home
        .into_iter()
        .filter_map(|(home_id, hours)| {
            let area_sqm = match areas.get(home_id) {
                Some(area) => *area,
                None => {
                    tracing::warn!(home_id, "device references unknown home, skipping");
                    return None;
                }
            };
            Some(HomeUsageSample {
                home_id: home_id.to_string(),
                area_sqm,
                avg_daily_hours: if days > 0.0 { hours / days } else { 0.0 },
            })
        })
        .collect();

    tracing::debug!(
        device_type,
        homes = samples.len(),
        days,
        "collected home usage samples"
    );
    samples
}

/// Pearson correlation between floor area and average daily usage.
pub fn area_usage_correlation(samples: Vec<HomeUsageSample>) -> AreaUsageReport {
    let areas: Vec<f64> = samples.iter().map(|s| s.area_sqm).collect();
    let usage: Vec<f64> = samples.iter().map(|s| s.avg_daily_hours).collect();

    let correlation_coefficient = pearson(&areas, &usage);

    AreaUsageReport {
        trend: Trend::from_coefficient(correlation_coefficient),
        area_range: ValueRange::of(&areas),
        usage_range: ValueRange::of(&usage),
        correlation_coefficient,
        samples,
    }
}

/// Sample covariance over the product of sample standard deviations.
///
/// `None` when there are fewer than two points or either series is constant.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if !(sx > 0.0 && sy > 0.0) {
        return None;
    }
    let r = xs.iter().covariance(ys.iter()) / (sx * sy);
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn home(id: &str, area: f64) -> HomeRecord {
        HomeRecord {
            home_id: id.to_string(),
            area_sqm: area,
        }
    }

    fn device(id: &str, home: &str, kind: &str) -> DeviceRecord {
        DeviceRecord {
            device_id: id.to_string(),
            home_id: home.to_string(),
            device_type: kind.to_string(),
            name: None,
        }
    }

    fn sample(id: &str, area: f64, hours: f64) -> HomeUsageSample {
        HomeUsageSample {
            home_id: id.to_string(),
            area_sqm: area,
            avg_daily_hours: hours,
        }
    }

    fn window() -> ObservationWindow {
        ObservationWindow::new(
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 11, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_samples_average_over_window_days() {
        let homes = vec![home("h1", 80.0), home("h2", 150.0), home("h3", 60.0)];
        let devices = vec![
            device("ac1", "h1", "air_conditioner"),
            device("ac2", "h2", "air_conditioner"),
            device("lamp", "h3", "light"),
        ];
        let t = Utc.with_ymd_and_hms(2025, 7, 3, 14, 0, 0).unwrap();
        let events = vec![
            UsageEvent::new("ac1", t, 10.0 * 3600.0).unwrap(),
            UsageEvent::new("ac1", t, 10.0 * 3600.0).unwrap(),
            UsageEvent::new("lamp", t, 3600.0).unwrap(),
            // Outside the window.
            UsageEvent::new("ac2", Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(), 3600.0)
                .unwrap(),
        ];

        let samples = home_usage_samples(&homes, &devices, &events, "air_conditioner", &window());
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].home_id, "h1");
        assert_relative_eq!(samples[0].avg_daily_hours, 2.0);
        assert_eq!(samples[1].home_id, "h2");
        assert_eq!(samples[1].avg_daily_hours, 0.0);
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let report = area_usage_correlation(vec![
            sample("a", 50.0, 1.0),
            sample("b", 100.0, 2.0),
            sample("c", 150.0, 3.0),
        ]);
        assert_relative_eq!(report.correlation_coefficient.unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(report.trend, Trend::StrongPositive);
        assert_eq!(report.area_range, Some(ValueRange { min: 50.0, max: 150.0 }));
    }

    #[test]
    fn test_negative_correlation() {
        let report = area_usage_correlation(vec![
            sample("a", 50.0, 3.0),
            sample("b", 100.0, 2.5),
            sample("c", 150.0, 0.5),
        ]);
        let r = report.correlation_coefficient.unwrap();
        assert!(r < -0.7);
        assert_eq!(report.trend, Trend::StrongNegative);
    }

    #[test]
    fn test_degenerate_inputs_have_no_coefficient() {
        let report = area_usage_correlation(Vec::new());
        assert!(report.correlation_coefficient.is_none());
        assert_eq!(report.trend, Trend::None);
        assert!(report.area_range.is_none());

        let report = area_usage_correlation(vec![sample("a", 50.0, 1.0)]);
        assert!(report.correlation_coefficient.is_none());

        let report = area_usage_correlation(vec![sample("a", 50.0, 1.0), sample("b", 90.0, 1.0)]);
        assert!(report.correlation_coefficient.is_none());
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(Trend::from_coefficient(Some(0.5)), Trend::ModeratePositive);
        assert_eq!(Trend::from_coefficient(Some(0.2)), Trend::WeakPositive);
        assert_eq!(Trend::from_coefficient(Some(0.1)), Trend::None);
        assert_eq!(Trend::from_coefficient(Some(-0.45)), Trend::ModerateNegative);
        assert_eq!(Trend::from_coefficient(None), Trend::None);
    }
}
