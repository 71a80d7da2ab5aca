use crate::error::AppError;
use crate::stats::{Confidence, ConfidenceThresholds, HistoricalAverage, RouteStatistics};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub mod linear_distance;
pub mod model;

use linear_distance::{LinearDistanceModel, LinearDistanceParams};
use model::CostModel;

/// Which strategy produced a [`CostEstimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstimateBasis {
    HistoricalAverage,
    DistanceFormula,
    Blended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub estimated_cost: f64,
    pub cost_per_km: f64,
    pub basis: EstimateBasis,
    pub confidence: Confidence,
    /// Historical records the estimate drew on, 0 for the pure formula.
    pub sample_size: usize,
    /// Share of the cost per km taken from history.
    pub history_weight: f64,
}

/// Weighting of thin history against the cost model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlendSettings {
    /// Upper bound on the weight given to low-confidence history.
    pub max_history_weight: f64,
    /// Sample count at which history would reach full weight before capping.
    pub saturation_samples: usize,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            max_history_weight: 0.5,
            saturation_samples: 10,
        }
    }
}

impl BlendSettings {
    pub fn history_weight(&self, sample_size: usize) -> f64 {
        (sample_size as f64 / self.saturation_samples as f64).min(self.max_history_weight)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.max_history_weight) {
            return Err("max_history_weight must be between 0 and 1".to_string());
        }
        if self.saturation_samples == 0 {
            return Err("saturation_samples must be at least 1".to_string());
        }
        Ok(())
    }
}

/// The `[estimation]` configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimationSettings {
    /// Fewest matching records for a purely historical estimate.
    pub min_history_samples: usize,
    pub formula: LinearDistanceParams,
    pub confidence: ConfidenceThresholds,
    pub blend: BlendSettings,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            min_history_samples: 3,
            formula: LinearDistanceParams::default(),
            confidence: ConfidenceThresholds::default(),
            blend: BlendSettings::default(),
        }
    }
}

impl EstimationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_history_samples == 0 {
            return Err("min_history_samples must be at least 1".to_string());
        }
        self.formula.validate()?;
        self.confidence.validate()?;
        self.blend.validate()
    }
}

/// Picks between route history and the cost model for a new trip.
#[derive(Debug)]
pub struct CostEstimator {
    model: Box<dyn CostModel>,
    min_history_samples: usize,
    blend: BlendSettings,
}

impl CostEstimator {
    pub fn new(
        model: Box<dyn CostModel>,
        min_history_samples: usize,
        blend: BlendSettings,
    ) -> Self {
        Self {
            model,
            min_history_samples,
            blend,
        }
    }

    pub fn from_settings(settings: &EstimationSettings) -> Self {
        Self::new(
            Box::new(LinearDistanceModel::new(settings.formula.clone())),
            settings.min_history_samples,
            settings.blend.clone(),
        )
    }

    /// Estimates the cost of a `distance_km` trip.
    ///
    /// Trusted history (medium or high route confidence with enough samples)
    /// is used as-is, weaker history is blended with the cost model, and the
    /// cost model alone covers routes with no history at all.
    pub fn estimate(
        &self,
        distance_km: f64,
        route: &RouteStatistics,
        history: Option<&HistoricalAverage>,
    ) -> Result<CostEstimate, AppError> {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "distance must be a positive number of kilometers, got {distance_km}"
            )));
        }

        let (cost_per_km, basis, confidence, sample_size, history_weight) = match history {
            Some(history)
                if matches!(route.confidence, Confidence::Medium | Confidence::High)
                    && history.sample_size >= self.min_history_samples =>
            {
                (
                    history.average_cost_per_km,
                    EstimateBasis::HistoricalAverage,
                    route.confidence,
                    history.sample_size,
                    1.0,
                )
            }
            Some(history) => {
                let weight = self.blend.history_weight(history.sample_size);
                let formula = self.model.cost_per_km(distance_km);
                warn!(
                    sample_size = history.sample_size,
                    weight, "Blending thin route history with cost model"
                );
                (
                    weight * history.average_cost_per_km + (1.0 - weight) * formula,
                    EstimateBasis::Blended,
                    Confidence::Low,
                    history.sample_size,
                    weight,
                )
            }
            None => {
                warn!(model = self.model.name(), "No route history, using cost model");
                (
                    self.model.cost_per_km(distance_km),
                    EstimateBasis::DistanceFormula,
                    Confidence::Low,
                    0,
                    0.0,
                )
            }
        };

        let estimated_cost = cost_per_km * distance_km;
        if !estimated_cost.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "distance {distance_km} km is too large to estimate"
            )));
        }
        Ok(CostEstimate {
            estimated_cost,
            cost_per_km: estimated_cost / distance_km,
            basis,
            confidence,
            sample_size,
            history_weight,
        })
    }
}
