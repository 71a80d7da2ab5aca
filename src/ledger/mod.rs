//! Historical trip ledger.
//!
//! Completed trips are appended once and never change. Route identity is the
//! ordered, normalized `(origin, destination)` pair.

use std::time::SystemTime;

pub mod memory;

pub use memory::InMemoryLedger;

/// Normalizes a free-text route endpoint for matching (trim + lowercase).
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub origin: String,
    pub destination: String,
}

impl RouteKey {
    pub fn new(origin: &str, destination: &str) -> Self {
        Self {
            origin: normalize_endpoint(origin),
            destination: normalize_endpoint(destination),
        }
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

/// A trip observation as supplied by the caller, before it is stamped and stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripRecordInput {
    pub origin: String,
    pub destination: String,
    /// Kilometers.
    pub distance: f64,
    /// Currency units.
    pub actual_cost: f64,
    /// Liters.
    pub fuel_consumed: f64,
    /// Minutes.
    pub duration: f64,
    pub vehicle_id: String,
    pub issues: Vec<String>,
}

/// One stored observation of a completed trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub actual_cost: f64,
    pub fuel_consumed: f64,
    pub duration: f64,
    /// Registration time, not necessarily the trip date.
    pub date: SystemTime,
    pub vehicle_id: String,
    pub issues: Vec<String>,
}

impl TripRecord {
    pub fn from_input(input: TripRecordInput, date: SystemTime) -> Self {
        let key = RouteKey::new(&input.origin, &input.destination);
        Self {
            origin: key.origin,
            destination: key.destination,
            distance: input.distance,
            actual_cost: input.actual_cost,
            fuel_consumed: input.fuel_consumed,
            duration: input.duration,
            date,
            vehicle_id: input.vehicle_id.trim().to_string(),
            issues: input.issues,
        }
    }

    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        }
    }

    /// Cost per kilometer of this single trip, 0 when distance is 0.
    pub fn cost_per_km(&self) -> f64 {
        if self.distance > 0.0 {
            self.actual_cost / self.distance
        } else {
            0.0
        }
    }
}

/// Storage backend for trip records.
///
/// Implementations must be append-only and return records in insertion order.
/// Returned vectors are copies; mutating them never affects the ledger.
pub trait TripLedger: Send + Sync + std::fmt::Debug {
    fn append(&mut self, record: TripRecord);

    /// Records for one route, oldest first.
    fn route_records(&self, key: &RouteKey) -> Vec<TripRecord>;

    /// Every record across all routes, oldest first.
    fn all_records(&self) -> Vec<TripRecord>;

    fn len(&self) -> usize;
}
