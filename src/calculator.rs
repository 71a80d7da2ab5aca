//! Route-cost calculator: the public contract over the trip ledger.
//!
//! One calculator is built at startup and shared with every request handler.

use crate::error::AppError;
use crate::estimation::{CostEstimate, CostEstimator, EstimationSettings};
use crate::ledger::{InMemoryLedger, RouteKey, TripLedger, TripRecord, TripRecordInput};
use crate::stats::{
    self, ConfidenceThresholds, HistoricalAverage, RouteStatistics, RouteSummary,
};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug)]
pub struct RouteCostCalculator<L: TripLedger = InMemoryLedger> {
    ledger: L,
    thresholds: ConfidenceThresholds,
    estimator: CostEstimator,
}

impl RouteCostCalculator<InMemoryLedger> {
    pub fn new() -> Self {
        Self::from_settings(InMemoryLedger::new(), &EstimationSettings::default())
    }
}

impl Default for RouteCostCalculator<InMemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: TripLedger> RouteCostCalculator<L> {
    pub fn with_parts(
        ledger: L,
        thresholds: ConfidenceThresholds,
        estimator: CostEstimator,
    ) -> Self {
        Self {
            ledger,
            thresholds,
            estimator,
        }
    }

    pub fn from_settings(ledger: L, settings: &EstimationSettings) -> Self {
        Self::with_parts(
            ledger,
            settings.confidence.clone(),
            CostEstimator::from_settings(settings),
        )
    }

    /// Appends a trip stamped with the current time.
    pub fn register_route_data(&mut self, input: TripRecordInput) -> TripRecord {
        self.register_route_data_at(input, SystemTime::now())
    }

    /// Appends a trip stamped with `date`. No validation happens here.
    pub fn register_route_data_at(
        &mut self,
        input: TripRecordInput,
        date: SystemTime,
    ) -> TripRecord {
        let record = TripRecord::from_input(input, date);
        debug!(
            origin = %record.origin,
            destination = %record.destination,
            vehicle_id = %record.vehicle_id,
            "Registering trip"
        );
        self.ledger.append(record.clone());
        record
    }

    pub fn historical_data(&self, origin: &str, destination: &str) -> Vec<TripRecord> {
        self.ledger.route_records(&RouteKey::new(origin, destination))
    }

    pub fn export_historical_data(&self) -> Vec<TripRecord> {
        self.ledger.all_records()
    }

    pub fn total_records(&self) -> usize {
        self.ledger.len()
    }

    pub fn route_statistics(&self, origin: &str, destination: &str) -> RouteStatistics {
        stats::route_statistics(&self.historical_data(origin, destination), &self.thresholds)
    }

    pub fn average_cost_from_history(
        &self,
        origin: &str,
        destination: &str,
        vehicle_id: Option<&str>,
    ) -> Option<HistoricalAverage> {
        stats::historical_average(&self.historical_data(origin, destination), vehicle_id)
    }

    pub fn estimate(
        &self,
        origin: &str,
        destination: &str,
        distance_km: f64,
        vehicle_id: Option<&str>,
    ) -> Result<CostEstimate, AppError> {
        let records = self.historical_data(origin, destination);
        let route = stats::route_statistics(&records, &self.thresholds);
        let history = stats::historical_average(&records, vehicle_id);
        self.estimator.estimate(distance_km, &route, history.as_ref())
    }

    pub fn route_summaries(&self) -> Vec<RouteSummary> {
        stats::summarize_routes(&self.ledger.all_records())
    }

    pub fn route_outliers(&self, origin: &str, destination: &str) -> Vec<TripRecord> {
        stats::find_outliers(&self.historical_data(origin, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::EstimateBasis;
    use crate::stats::Confidence;
    use std::time::{Duration, UNIX_EPOCH};

    fn input(
        origin: &str,
        destination: &str,
        distance: f64,
        cost: f64,
        vehicle: &str,
    ) -> TripRecordInput {
        TripRecordInput {
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance,
            actual_cost: cost,
            vehicle_id: vehicle.to_string(),
            ..TripRecordInput::default()
        }
    }

    #[test]
    fn register_stamps_and_stores_record() {
        let mut calculator = RouteCostCalculator::new();
        let date = UNIX_EPOCH + Duration::from_secs(60);

        let record =
            calculator.register_route_data_at(input(" Lyon", "Paris ", 465.0, 930.0, "V1"), date);

        assert_eq!(record.date, date);
        assert_eq!(calculator.historical_data("LYON", "paris"), vec![record]);
        assert_eq!(calculator.total_records(), 1);
    }

    #[test]
    fn ledger_accepts_unvalidated_records() {
        let mut calculator = RouteCostCalculator::new();
        calculator.register_route_data(input("A", "B", 0.0, -10.0, ""));

        assert_eq!(calculator.export_historical_data().len(), 1);
        assert_eq!(calculator.route_statistics("A", "B").average_cost_per_km, 0.0);
    }

    #[test]
    fn estimate_prefers_history_once_route_is_trusted() -> Result<(), AppError> {
        let mut calculator = RouteCostCalculator::new();
        for cost in [300.0, 310.0] {
            calculator.register_route_data(input("A", "B", 100.0, cost, "V1"));
        }
        assert_eq!(calculator.estimate("A", "B", 100.0, None)?.basis, EstimateBasis::Blended);

        calculator.register_route_data(input("A", "B", 100.0, 305.0, "V1"));
        let estimate = calculator.estimate("A", "B", 100.0, None)?;

        assert_eq!(estimate.basis, EstimateBasis::HistoricalAverage);
        assert_eq!(estimate.confidence, Confidence::Medium);
        assert_eq!(estimate.sample_size, 3);
        assert!((estimate.estimated_cost - 305.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn estimate_for_vehicle_without_history_uses_formula() -> Result<(), AppError> {
        let mut calculator = RouteCostCalculator::new();
        for _ in 0..5 {
            calculator.register_route_data(input("A", "B", 100.0, 300.0, "V1"));
        }

        let estimate = calculator.estimate("A", "B", 10.0, Some("V9"))?;

        assert_eq!(estimate.basis, EstimateBasis::DistanceFormula);
        assert_eq!(estimate.sample_size, 0);
        Ok(())
    }

    #[test]
    fn outliers_and_summaries_reflect_ledger() {
        let mut calculator = RouteCostCalculator::new();
        for _ in 0..9 {
            calculator.register_route_data(input("A", "B", 10.0, 100.0, "V1"));
        }
        calculator.register_route_data(input("A", "B", 10.0, 1000.0, "V2"));
        calculator.register_route_data(input("B", "A", 10.0, 100.0, "V1"));

        let outliers = calculator.route_outliers("a", "b");
        let summaries = calculator.route_summaries();

        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].vehicle_id, "V2");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].trip_count, 10);
        assert_eq!(summaries[0].vehicle_count, 2);
    }
}
