use crate::calculator::RouteCostCalculator;
use axum::Router;
use axum::routing::get;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod requests;
pub mod responses;

/// The calculator instance shared by every request handler.
pub type SharedCalculator = Arc<RwLock<RouteCostCalculator>>;

pub fn router(state: SharedCalculator) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route(
            "/api/route-costs",
            get(handlers::get_route_costs).post(handlers::register_trip),
        )
        .route("/api/route-costs/estimate", get(handlers::get_estimate))
        .route("/api/route-costs/outliers", get(handlers::get_outliers))
        .with_state(state)
}
