//! Descriptive statistics over a route's trip history.

use crate::ledger::{RouteKey, TripRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Relative change in cost per km between the older and newer half of a
/// route's history above which the route is trending.
pub const TREND_CHANGE_THRESHOLD: f64 = 0.10;
pub const TREND_MIN_SAMPLES: usize = 4;
/// Costs further than this many standard deviations from the mean are outliers.
pub const OUTLIER_STD_DEVS: f64 = 2.0;
pub const OUTLIER_MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// Sample-size and coefficient-of-variation limits for each confidence level.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Below this many samples confidence is always low.
    pub medium_min_samples: usize,
    /// From this many samples on, high confidence becomes reachable.
    pub high_min_samples: usize,
    /// Largest cv still rated medium below `high_min_samples`.
    pub medium_max_cv: f64,
    /// Largest cv rated high.
    pub high_max_cv: f64,
    /// Largest cv still rated medium at or above `high_min_samples`.
    pub high_tier_medium_max_cv: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            medium_min_samples: 3,
            high_min_samples: 10,
            medium_max_cv: 0.3,
            high_max_cv: 0.2,
            high_tier_medium_max_cv: 0.4,
        }
    }
}

impl ConfidenceThresholds {
    pub fn classify(&self, count: usize, cv: f64) -> Confidence {
        if count < self.medium_min_samples {
            Confidence::Low
        } else if count < self.high_min_samples {
            if cv <= self.medium_max_cv {
                Confidence::Medium
            } else {
                Confidence::Low
            }
        } else if cv <= self.high_max_cv {
            Confidence::High
        } else if cv <= self.high_tier_medium_max_cv {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Checks that more samples and a lower cv can never lower the level.
    pub fn validate(&self) -> Result<(), String> {
        if self.medium_min_samples == 0 {
            return Err("medium_min_samples must be at least 1".to_string());
        }
        if self.medium_min_samples > self.high_min_samples {
            return Err("medium_min_samples must not exceed high_min_samples".to_string());
        }
        for (name, value) in [
            ("medium_max_cv", self.medium_max_cv),
            ("high_max_cv", self.high_max_cv),
            ("high_tier_medium_max_cv", self.high_tier_medium_max_cv),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        if self.high_max_cv > self.high_tier_medium_max_cv {
            return Err("high_max_cv must not exceed high_tier_medium_max_cv".to_string());
        }
        if self.medium_max_cv > self.high_tier_medium_max_cv {
            return Err("medium_max_cv must not exceed high_tier_medium_max_cv".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatistics {
    pub count: usize,
    pub average_cost: f64,
    pub average_distance: f64,
    /// Total cost over total distance.
    pub average_cost_per_km: f64,
    pub min_cost: f64,
    pub max_cost: f64,
    /// Sample standard deviation of `actual_cost`.
    pub cost_std_dev: f64,
    pub confidence: Confidence,
    pub average_fuel_consumed: f64,
    pub average_duration: f64,
    pub trend: CostTrend,
    pub outlier_count: usize,
    pub issue_counts: BTreeMap<String, usize>,
}

impl RouteStatistics {
    pub fn empty() -> Self {
        Self {
            count: 0,
            average_cost: 0.0,
            average_distance: 0.0,
            average_cost_per_km: 0.0,
            min_cost: 0.0,
            max_cost: 0.0,
            cost_std_dev: 0.0,
            confidence: Confidence::Low,
            average_fuel_consumed: 0.0,
            average_duration: 0.0,
            trend: CostTrend::InsufficientData,
            outlier_count: 0,
            issue_counts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalAverage {
    pub average_cost: f64,
    pub average_cost_per_km: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub origin: String,
    pub destination: String,
    pub trip_count: usize,
    pub average_cost: f64,
    pub average_distance: f64,
    pub average_cost_per_km: f64,
    pub vehicle_count: usize,
}

pub fn route_statistics(
    records: &[TripRecord],
    thresholds: &ConfidenceThresholds,
) -> RouteStatistics {
    let count = records.len();
    if count == 0 {
        return RouteStatistics::empty();
    }

    let n = count as f64;
    let total_cost: f64 = records.iter().map(|r| r.actual_cost).sum();
    let total_distance: f64 = records.iter().map(|r| r.distance).sum();
    let average_cost = total_cost / n;
    let cost_std_dev = sample_std_dev(records.iter().map(|r| r.actual_cost), average_cost, count);
    let cv = coefficient_of_variation(cost_std_dev, average_cost);

    let min_cost = records
        .iter()
        .map(|r| r.actual_cost)
        .fold(f64::INFINITY, f64::min);
    let max_cost = records
        .iter()
        .map(|r| r.actual_cost)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut issue_counts = BTreeMap::new();
    for issue in records.iter().flat_map(|r| r.issues.iter()) {
        *issue_counts.entry(issue.clone()).or_insert(0) += 1;
    }

    RouteStatistics {
        count,
        average_cost,
        average_distance: total_distance / n,
        average_cost_per_km: ratio_of_sums(total_cost, total_distance),
        min_cost,
        max_cost,
        cost_std_dev,
        confidence: thresholds.classify(count, cv),
        average_fuel_consumed: records.iter().map(|r| r.fuel_consumed).sum::<f64>() / n,
        average_duration: records.iter().map(|r| r.duration).sum::<f64>() / n,
        trend: cost_trend(records),
        outlier_count: outlier_positions(records).len(),
        issue_counts,
    }
}

/// Average cost over the matching records, optionally restricted to one vehicle.
///
/// Returns `None` when nothing matches.
pub fn historical_average(
    records: &[TripRecord],
    vehicle_id: Option<&str>,
) -> Option<HistoricalAverage> {
    let vehicle_id = vehicle_id.map(str::trim);
    let mut sample_size = 0usize;
    let mut total_cost = 0.0;
    let mut total_distance = 0.0;

    for record in records {
        if let Some(vehicle_id) = vehicle_id
            && record.vehicle_id != vehicle_id
        {
            continue;
        }
        sample_size += 1;
        total_cost += record.actual_cost;
        total_distance += record.distance;
    }

    if sample_size == 0 {
        return None;
    }

    Some(HistoricalAverage {
        average_cost: total_cost / sample_size as f64,
        average_cost_per_km: ratio_of_sums(total_cost, total_distance),
        sample_size,
    })
}

/// Records whose cost sits more than [`OUTLIER_STD_DEVS`] deviations from the mean.
pub fn find_outliers(records: &[TripRecord]) -> Vec<TripRecord> {
    outlier_positions(records)
        .into_iter()
        .filter_map(|index| records.get(index).cloned())
        .collect()
}

/// Per-route aggregates over the whole ledger, ordered by route.
pub fn summarize_routes(records: &[TripRecord]) -> Vec<RouteSummary> {
    #[derive(Default)]
    struct Accumulator {
        trips: usize,
        total_cost: f64,
        total_distance: f64,
        vehicles: BTreeSet<String>,
    }

    let mut routes: BTreeMap<RouteKey, Accumulator> = BTreeMap::new();
    for record in records {
        let entry = routes.entry(record.route_key()).or_default();
        entry.trips += 1;
        entry.total_cost += record.actual_cost;
        entry.total_distance += record.distance;
        entry.vehicles.insert(record.vehicle_id.clone());
    }

    routes
        .into_iter()
        .map(|(key, acc)| {
            let n = acc.trips as f64;
            RouteSummary {
                origin: key.origin,
                destination: key.destination,
                trip_count: acc.trips,
                average_cost: acc.total_cost / n,
                average_distance: acc.total_distance / n,
                average_cost_per_km: ratio_of_sums(acc.total_cost, acc.total_distance),
                vehicle_count: acc.vehicles.len(),
            }
        })
        .collect()
}

fn ratio_of_sums(total_cost: f64, total_distance: f64) -> f64 {
    if total_distance > 0.0 {
        total_cost / total_distance
    } else {
        0.0
    }
}

fn coefficient_of_variation(std_dev: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        std_dev / mean.abs()
    }
}

fn sample_std_dev(values: impl Iterator<Item = f64>, mean: f64, count: usize) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    let sum_sq: f64 = values.map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (count - 1) as f64).sqrt()
}

fn cost_trend(records: &[TripRecord]) -> CostTrend {
    if records.len() < TREND_MIN_SAMPLES {
        return CostTrend::InsufficientData;
    }
    let (older, newer) = records.split_at(records.len() / 2);
    let cost_per_km = |half: &[TripRecord]| {
        ratio_of_sums(
            half.iter().map(|r| r.actual_cost).sum(),
            half.iter().map(|r| r.distance).sum(),
        )
    };
    let older = cost_per_km(older);
    let newer = cost_per_km(newer);
    if older <= 0.0 {
        return CostTrend::Stable;
    }

    let change = (newer - older) / older;
    if change > TREND_CHANGE_THRESHOLD {
        CostTrend::Increasing
    } else if change < -TREND_CHANGE_THRESHOLD {
        CostTrend::Decreasing
    } else {
        CostTrend::Stable
    }
}

fn outlier_positions(records: &[TripRecord]) -> Vec<usize> {
    let count = records.len();
    if count < OUTLIER_MIN_SAMPLES {
        return Vec::new();
    }
    let mean = records.iter().map(|r| r.actual_cost).sum::<f64>() / count as f64;
    let std_dev = sample_std_dev(records.iter().map(|r| r.actual_cost), mean, count);
    if std_dev <= 0.0 {
        return Vec::new();
    }

    records
        .iter()
        .enumerate()
        .filter(|(_, r)| (r.actual_cost - mean).abs() > OUTLIER_STD_DEVS * std_dev)
        .map(|(index, _)| index)
        .collect()
}
