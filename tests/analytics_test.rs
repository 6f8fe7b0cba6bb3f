//! End-to-end tests over the public analytics API

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use smarthome_analytics::core::{
    aggregate_usage, area_usage_correlation, build_histogram, correlate, home_usage_samples,
    summarize_distribution, summarize_with_resolution, top_correlations, DistributionSummary,
    Granularity, ObservationWindow, ReportBuilder, ReportKind, ResolutionSummary, Trend,
};
use smarthome_analytics::ingest::{
    group_by_device, parse_records, AlertRecord, DeviceRecord, FeedbackRecord, HomeRecord,
    UsageEvent,
};
use smarthome_analytics::logging;

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, d, h, m, 0).unwrap()
}

fn reference() -> DateTime<Tz> {
    utc(14, 18, 0).with_timezone(&Tz::UTC)
}

fn usage(device: &str, start: DateTime<Utc>, secs: f64) -> UsageEvent {
    UsageEvent::new(device, start, secs).unwrap()
}

#[test]
fn test_single_day_usage_lands_in_one_bucket() {
    logging::init_test();
    let events = vec![
        usage("D1", utc(12, 8, 0), 3600.0),
        usage("D1", utc(12, 13, 0), 1800.0),
        usage("D1", utc(12, 21, 0), 900.0),
    ];

    let result = aggregate_usage(&events, reference(), 7, Granularity::Day).unwrap();

    assert_eq!(result.buckets.len(), 7);
    let hours: Vec<f64> = result.buckets.iter().map(|b| b.total_hours).collect();
    assert_eq!(hours, vec![0.0, 0.0, 0.0, 0.0, 1.75, 0.0, 0.0]);
    assert_eq!(result.buckets[4].label, "06-12");
    assert_eq!(result.total_hours, 1.75);
}

#[test]
fn test_empty_input_yields_zero_filled_buckets() {
    for granularity in [Granularity::Day, Granularity::Week] {
        let result = aggregate_usage(&[], reference(), 5, granularity).unwrap();
        assert_eq!(result.buckets.len(), 5);
        assert!(result.buckets.iter().all(|b| b.total_hours == 0.0));
        assert_eq!(result.average_hours, 0.0);
    }
}

#[test]
fn test_bucket_totals_match_covered_durations() {
    let events: Vec<UsageEvent> = (0..40)
        .map(|i| {
            let start = utc(1, 0, 0) + Duration::minutes(i * 517);
            usage(if i % 2 == 0 { "fan" } else { "tv" }, start, 60.0 * (i as f64 + 1.0))
        })
        .collect();

    let result = aggregate_usage(&events, reference(), 3, Granularity::Week).unwrap();
    let first = result.buckets[0].interval_start;
    let last = result.buckets[2].interval_end;
    let expected: f64 = events
        .iter()
        .filter(|e| e.start_time() >= first && e.start_time() < last)
        .map(|e| e.duration_hours())
        .sum();

    let bucket_sum: f64 = result.buckets.iter().map(|b| b.total_hours).sum();
    assert_relative_eq!(bucket_sum, expected, epsilon = 1e-9);
    assert_relative_eq!(result.total_hours, expected, epsilon = 1e-9);
}

#[test]
fn test_histogram_total_equals_slot_sum() {
    let events = vec![
        usage("lamp", utc(10, 19, 30), 7200.0),
        usage("lamp", utc(11, 19, 10), 3600.0),
        usage("lamp", utc(11, 7, 0), 600.0),
    ];
    let window = ObservationWindow::trailing_days(reference().with_timezone(&Utc), 30).unwrap();
    let histogram = build_histogram(&events, &window, &Tz::UTC);

    let sum: f64 = histogram.slots.iter().map(|s| s.total_hours).sum();
    assert_relative_eq!(histogram.total_hours, sum);
    assert_eq!(histogram.peak_label, "18:00-20:00");
    assert_eq!(histogram.slots[9].event_count, 2);
}

#[test]
fn test_correlation_same_slice() {
    let events = vec![usage("D1", utc(3, 10, 2), 60.0), usage("D2", utc(3, 10, 27), 60.0)];
    let pairs = correlate(&group_by_device(&events), 30, &Tz::UTC).unwrap();

    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|p| p.probability == 1.0));
    assert_eq!((pairs[0].device_a.as_str(), pairs[0].device_b.as_str()), ("D1", "D2"));
    assert_eq!((pairs[1].device_a.as_str(), pairs[1].device_b.as_str()), ("D2", "D1"));
}

#[test]
fn test_correlation_is_directional() {
    // D1 active in four slices, D2 in two of them.
    let events = vec![
        usage("D1", utc(3, 8, 0), 60.0),
        usage("D1", utc(3, 9, 0), 60.0),
        usage("D1", utc(3, 10, 0), 60.0),
        usage("D1", utc(3, 11, 0), 60.0),
        usage("D2", utc(3, 8, 5), 60.0),
        usage("D2", utc(3, 10, 15), 60.0),
    ];
    let pairs = correlate(&group_by_device(&events), 30, &Tz::UTC).unwrap();

    assert_eq!(pairs[0].device_a, "D2");
    assert_eq!(pairs[0].probability, 1.0);
    assert_eq!(pairs[1].device_a, "D1");
    assert_eq!(pairs[1].probability, 0.5);
    assert!(pairs.iter().all(|p| (0.0..=1.0).contains(&p.probability)));

    let top = top_correlations(&pairs, 5, 0.6);
    assert_eq!(top.len(), 1);
}

#[test]
fn test_correlation_uses_local_clock() {
    // Kathmandu is UTC+05:45.
    let tz = chrono_tz::Asia::Kathmandu;
    let events = vec![
        usage("D1", utc(3, 23, 50), 60.0),
        usage("D2", utc(4, 0, 5), 60.0),
    ];
    let grouped = group_by_device(&events);

    // Local 05:35 and 05:50 share the 05:30 slice; in UTC they straddle midnight.
    let local = correlate(&grouped, 30, &tz).unwrap();
    assert!(local.iter().all(|p| p.probability == 1.0));

    let utc_aligned = correlate(&grouped, 30, &Tz::UTC).unwrap();
    assert!(utc_aligned.iter().all(|p| p.probability == 0.0));
}

#[test]
fn test_correlation_rejects_bad_window() {
    let events = group_by_device(&[usage("D1", utc(3, 8, 0), 60.0)]);
    assert!(correlate(&events, 0, &Tz::UTC).is_err());
    assert!(correlate(&events, 7, &Tz::UTC).is_err());
}

#[test]
fn test_empty_records_yield_empty_distribution() {
    let alerts: Vec<AlertRecord> = parse_records("").unwrap();
    assert!(summarize_distribution(&alerts, |a| a.alert_type.clone()).is_empty());

    let feedback: Vec<FeedbackRecord> = parse_records("[]").unwrap();
    let stats = summarize_with_resolution(&feedback, |f| f.device_type.clone(), |f| f.resolved);
    assert!(stats.is_empty());
}

#[test]
fn test_alert_distribution_from_jsonl() {
    let content = r#"
{"alert_type": "smoke", "home_id": "h1", "device_type": "detector"}
{"alert_type": "door_open", "home_id": "h1", "device_type": "lock"}
{"alert_type": "smoke", "home_id": "h2", "device_type": "detector"}
"#;
    let alerts: Vec<AlertRecord> = parse_records(content).unwrap();
    let summary = DistributionSummary::from_stats(summarize_distribution(&alerts, |a| {
        a.alert_type.clone()
    }));

    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.most_common.as_deref(), Some("smoke"));
    let total: f64 = summary.categories.iter().map(|c| c.percentage).sum();
    assert_relative_eq!(total, 100.0, epsilon = 1e-9);
}

#[test]
fn test_feedback_resolution_summary() {
    let content = r#"[
        {"device_type": "thermostat", "resolved": true},
        {"device_type": "thermostat", "resolved": true},
        {"device_type": "camera", "resolved": false},
        {"device_type": "camera", "resolved": true}
    ]"#;
    let feedback: Vec<FeedbackRecord> = parse_records(content).unwrap();
    let summary = ResolutionSummary::from_stats(summarize_with_resolution(
        &feedback,
        |f| f.device_type.clone(),
        |f| f.resolved,
    ));

    assert_eq!(summary.overall_resolution_rate, 75.0);
    assert_eq!(summary.best_resolution.as_deref(), Some("thermostat"));
    assert_eq!(summary.worst_resolution.as_deref(), Some("camera"));
}

#[test]
fn test_area_usage_report() {
    let homes: Vec<HomeRecord> = parse_records(
        r#"[{"home_id": "a", "area_sqm": 60}, {"home_id": "b", "area_sqm": 120}, {"home_id": "c", "area_sqm": 180}]"#,
    )
    .unwrap();
    let devices: Vec<DeviceRecord> = parse_records(
        r#"[
            {"device_id": "ac-a", "home_id": "a", "device_type": "air_conditioner"},
            {"device_id": "ac-b", "home_id": "b", "device_type": "air_conditioner"},
            {"device_id": "ac-c", "home_id": "c", "device_type": "air_conditioner"}
        ]"#,
    )
    .unwrap();
    let events = vec![
        usage("ac-a", utc(10, 12, 0), 3600.0),
        usage("ac-b", utc(10, 12, 0), 2.0 * 3600.0),
        usage("ac-c", utc(10, 12, 0), 3.0 * 3600.0),
    ];
    let window = ObservationWindow::trailing_days(reference().with_timezone(&Utc), 10).unwrap();

    let samples = home_usage_samples(&homes, &devices, &events, "air_conditioner", &window);
    assert_eq!(samples.len(), 3);
    assert_relative_eq!(samples[2].avg_daily_hours, 0.3, epsilon = 1e-12);

    let report = area_usage_correlation(samples);
    assert_relative_eq!(report.correlation_coefficient.unwrap(), 1.0, epsilon = 1e-9);
    assert_eq!(report.trend, Trend::StrongPositive);
}

#[test]
fn test_report_serializes_rounded_payload() {
    let events = vec![usage("D1", utc(14, 9, 0), 1000.0)];
    let result = aggregate_usage(&events, reference(), 1, Granularity::Day).unwrap();

    let json = ReportBuilder::new(chrono_tz::Asia::Tokyo)
        .build_json(ReportKind::Usage, &result)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["kind"], "usage");
    assert_eq!(value["timezone"], "Asia/Tokyo");
    assert_eq!(value["payload"]["granularity"], "day");
    assert_eq!(value["payload"]["buckets"][0]["total_hours"], 0.28);
}
