use crate::error::AppError;
use crate::ledger::TripRecordInput;
use serde::Deserialize;

/// Upper bound for any trip quantity (km, currency, liters, minutes) accepted
/// at the boundary; keeps route sums finite.
pub const MAX_TRIP_QUANTITY: f64 = 1.0e9;

/// Body of `POST /api/route-costs`.
///
/// Every field is optional at the serde level so that a missing field is
/// reported by name instead of as a generic deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTripRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance: Option<f64>,
    pub actual_cost: Option<f64>,
    pub fuel_consumed: Option<f64>,
    pub duration: Option<f64>,
    pub vehicle_id: Option<String>,
    pub issues: Option<Vec<String>>,
}

impl RegisterTripRequest {
    pub fn validate(self) -> Result<TripRecordInput, AppError> {
        let origin = required_text(self.origin, "origin")?;
        let destination = required_text(self.destination, "destination")?;
        let vehicle_id = required_text(self.vehicle_id, "vehicleId")?;
        let distance = positive(self.distance, "distance")?;
        let actual_cost = positive(self.actual_cost, "actualCost")?;
        let fuel_consumed = non_negative(self.fuel_consumed, "fuelConsumed")?;
        let duration = non_negative(self.duration, "duration")?;
        let issues = self
            .issues
            .unwrap_or_default()
            .into_iter()
            .filter_map(|issue| optional_text(Some(issue)))
            .collect();

        Ok(TripRecordInput {
            origin,
            destination,
            distance,
            actual_cost,
            fuel_consumed,
            duration,
            vehicle_id,
            issues,
        })
    }
}

/// Query string of `GET /api/route-costs` and `GET /api/route-costs/outliers`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub vehicle_id: Option<String>,
    pub export: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteQueryMode {
    ExportAll,
    Route {
        origin: String,
        destination: String,
        vehicle_id: Option<String>,
    },
    Summary,
}

impl RouteQuery {
    pub fn mode(self) -> Result<RouteQueryMode, AppError> {
        let export_all = self
            .export
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("all"));
        if export_all {
            return Ok(RouteQueryMode::ExportAll);
        }

        match (optional_text(self.origin), optional_text(self.destination)) {
            (Some(origin), Some(destination)) => Ok(RouteQueryMode::Route {
                origin,
                destination,
                vehicle_id: optional_text(self.vehicle_id),
            }),
            (None, None) => Ok(RouteQueryMode::Summary),
            (Some(_), None) => Err(missing("destination")),
            (None, Some(_)) => Err(missing("origin")),
        }
    }

    /// Route endpoints for queries that always need a route.
    pub fn route(self) -> Result<(String, String), AppError> {
        let origin = required_text(self.origin, "origin")?;
        let destination = required_text(self.destination, "destination")?;
        Ok((origin, destination))
    }
}

/// Query string of `GET /api/route-costs/estimate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance: Option<f64>,
    pub vehicle_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub vehicle_id: Option<String>,
}

impl EstimateQuery {
    pub fn validate(self) -> Result<EstimateRequest, AppError> {
        Ok(EstimateRequest {
            origin: required_text(self.origin, "origin")?,
            destination: required_text(self.destination, "destination")?,
            distance: positive(self.distance, "distance")?,
            vehicle_id: optional_text(self.vehicle_id),
        })
    }
}

fn missing(field: &str) -> AppError {
    AppError::InvalidInput(format!("{field} is required"))
}

fn too_large(field: &str, value: f64) -> AppError {
    AppError::InvalidInput(format!(
        "{field} must not exceed {MAX_TRIP_QUANTITY}, got {value}"
    ))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    optional_text(value).ok_or_else(|| missing(field))
}

fn positive(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 && v <= MAX_TRIP_QUANTITY => Ok(v),
        Some(v) if v > MAX_TRIP_QUANTITY => Err(too_large(field, v)),
        Some(v) => Err(AppError::InvalidInput(format!(
            "{field} must be greater than 0, got {v}"
        ))),
        None => Err(missing(field)),
    }
}

fn non_negative(value: Option<f64>, field: &str) -> Result<f64, AppError> {
    match value {
        None => Ok(0.0),
        Some(v) if v.is_finite() && v >= 0.0 && v <= MAX_TRIP_QUANTITY => Ok(v),
        Some(v) if v > MAX_TRIP_QUANTITY => Err(too_large(field, v)),
        Some(v) => Err(AppError::InvalidInput(format!(
            "{field} must not be negative, got {v}"
        ))),
    }
}
