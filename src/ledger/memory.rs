use crate::ledger::{RouteKey, TripLedger, TripRecord};
use std::collections::HashMap;

/// Process-lifetime ledger backed by a `Vec`, with a per-route index of positions.
///
/// Grows without bound; there is no eviction.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Vec<TripRecord>,
    by_route: HashMap<RouteKey, Vec<usize>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TripLedger for InMemoryLedger {
    fn append(&mut self, record: TripRecord) {
        let index = self.records.len();
        self.by_route
            .entry(record.route_key())
            .or_default()
            .push(index);
        self.records.push(record);
    }

    fn route_records(&self, key: &RouteKey) -> Vec<TripRecord> {
        self.by_route
            .get(key)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&index| self.records.get(index).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_records(&self) -> Vec<TripRecord> {
        self.records.clone()
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
