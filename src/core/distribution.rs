//! Category distributions over alert and feedback records.
//!
//! Records are grouped by a caller-supplied category key. Each group reports
//! its count and share of the total; the resolution variant also splits each
//! group into resolved and unresolved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::rounding;

/// Count and share for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: String,
    pub count: usize,
    /// Share of all records, 0..=100
    #[serde(serialize_with = "rounding::serialize")]
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved_count: Option<usize>,
    /// Share of this category's records that are resolved
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "rounding::serialize_option"
    )]
    pub resolved_percentage: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "rounding::serialize_option"
    )]
    pub unresolved_percentage: Option<f64>,
}

#[derive(Default)]
struct Tally {
    count: usize,
    resolved: usize,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn tally<T, F, R>(records: &[T], category_fn: F, resolved_fn: R) -> BTreeMap<String, Tally>
where
    F: Fn(&T) -> String,
    R: Fn(&T) -> bool,
{
    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(category_fn(record)).or_default();
        entry.count += 1;
        if resolved_fn(record) {
            entry.resolved += 1;
        }
    }
    groups
}

/// Count descending, then category ascending.
fn sort_stats(stats: &mut [CategoryStat]) {
    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
}

/// Group `records` by `category_fn` and report each group's count and share.
pub fn summarize_distribution<T, F>(records: &[T], category_fn: F) -> Vec<CategoryStat>
where
    F: Fn(&T) -> String,
{
    let total = records.len();
    let mut stats: Vec<CategoryStat> = tally(records, category_fn, |_| false)
        .into_iter()
        .map(|(category, t)| CategoryStat {
            category,
            count: t.count,
            percentage: percent(t.count, total),
            resolved_count: None,
            unresolved_count: None,
            resolved_percentage: None,
            unresolved_percentage: None,
        })
        .collect();
    sort_stats(&mut stats);

    tracing::debug!(records = total, categories = stats.len(), "summarized distribution");
    stats
}

/// Like [`summarize_distribution`], additionally splitting each group by
/// `resolved_fn`.
pub fn summarize_with_resolution<T, F, R>(
    records: &[T],
    category_fn: F,
    resolved_fn: R,
) -> Vec<CategoryStat>
where
    F: Fn(&T) -> String,
    R: Fn(&T) -> bool,
{
    let total = records.len();
    let mut stats: Vec<CategoryStat> = tally(records, category_fn, resolved_fn)
        .into_iter()
        .map(|(category, t)| {
            let unresolved = t.count - t.resolved;
            CategoryStat {
                category,
                count: t.count,
                percentage: percent(t.count, total),
                resolved_count: Some(t.resolved),
                unresolved_count: Some(unresolved),
                resolved_percentage: Some(percent(t.resolved, t.count)),
                unresolved_percentage: Some(percent(unresolved, t.count)),
            }
        })
        .collect();
    sort_stats(&mut stats);

    tracing::debug!(
        records = total,
        categories = stats.len(),
        "summarized distribution with resolution"
    );
    stats
}

/// Distribution with its headline figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub total_count: usize,
    pub most_common: Option<String>,
    pub categories: Vec<CategoryStat>,
}

impl DistributionSummary {
    /// `stats` must already be in count-descending order.
    pub fn from_stats(stats: Vec<CategoryStat>) -> Self {
        Self {
            total_count: stats.iter().map(|s| s.count).sum(),
            most_common: stats.first().map(|s| s.category.clone()),
            categories: stats,
        }
    }
}

/// Resolution distribution with overall and extreme resolution rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub total_count: usize,
    #[serde(serialize_with = "rounding::serialize")]
    pub overall_resolution_rate: f64,
    pub best_resolution: Option<String>,
    pub worst_resolution: Option<String>,
    pub categories: Vec<CategoryStat>,
}

impl ResolutionSummary {
    pub fn from_stats(stats: Vec<CategoryStat>) -> Self {
        let total_count: usize = stats.iter().map(|s| s.count).sum();
        let resolved: usize = stats.iter().filter_map(|s| s.resolved_count).sum();

        let rate = |s: &CategoryStat| s.resolved_percentage.unwrap_or(0.0);

        // Ties resolve to the alphabetically first category in both directions.
        let mut best: Option<&CategoryStat> = None;
        let mut worst: Option<&CategoryStat> = None;
        for stat in &stats {
            let better = match best {
                None => true,
                Some(b) => rate(stat) > rate(b) || (rate(stat) == rate(b) && stat.category < b.category),
            };
            if better {
                best = Some(stat);
            }
            let lower = match worst {
                None => true,
                Some(w) => rate(stat) < rate(w) || (rate(stat) == rate(w) && stat.category < w.category),
            };
            if lower {
                worst = Some(stat);
            }
        }

        Self {
            total_count,
            overall_resolution_rate: percent(resolved, total_count),
            best_resolution: best.map(|s| s.category.clone()),
            worst_resolution: worst.map(|s| s.category.clone()),
            categories: stats,
        }
    }
}
