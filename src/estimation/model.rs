//! Cost model trait for the context-free fallback estimate.
//!
//! A cost model prices a trip from its distance alone, with no route history.
//! The estimator uses it on its own when a route has no history and mixes it
//! with thin history otherwise.

/// Trait for distance-based cost models.
pub trait CostModel: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Cost per kilometer for a trip of the given length.
    fn cost_per_km(&self, distance_km: f64) -> f64;
}
