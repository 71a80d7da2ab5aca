//! Linear distance model.
//!
//! Formula: cost = (base_rate_per_km + fuel_overhead_per_km) * distance_km

use crate::estimation::model::CostModel;
use serde::Deserialize;

/// Linear distance model parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinearDistanceParams {
    /// Carrier rate per kilometer.
    pub base_rate_per_km: f64,
    /// Fixed fuel and overhead surcharge per kilometer.
    pub fuel_overhead_per_km: f64,
}

impl Default for LinearDistanceParams {
    fn default() -> Self {
        Self {
            base_rate_per_km: 2.5,
            fuel_overhead_per_km: 0.75,
        }
    }
}

impl LinearDistanceParams {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("base_rate_per_km", self.base_rate_per_km),
            ("fuel_overhead_per_km", self.fuel_overhead_per_km),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct LinearDistanceModel {
    pub params: LinearDistanceParams,
}

impl LinearDistanceModel {
    pub fn new(params: LinearDistanceParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(LinearDistanceParams::default())
    }
}

impl CostModel for LinearDistanceModel {
    fn name(&self) -> &'static str {
        "linear_distance"
    }

    fn cost_per_km(&self, _distance_km: f64) -> f64 {
        self.params.base_rate_per_km + self.params.fuel_overhead_per_km
    }
}
