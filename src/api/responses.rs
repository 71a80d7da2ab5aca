use crate::estimation::CostEstimate;
use crate::stats::{HistoricalAverage, RouteStatistics, RouteSummary};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripRecordResponse {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub actual_cost: f64,
    pub fuel_consumed: f64,
    pub duration: f64,
    pub date: String,
    pub vehicle_id: String,
    pub issues: Vec<String>,
    pub cost_per_km: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTripResponse {
    pub message: String,
    pub data: TripRecordResponse,
    pub statistics: RouteStatistics,
    pub average_data: Option<HistoricalAverage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHistoryResponse {
    pub route: String,
    pub total_trips: usize,
    pub data: Vec<TripRecordResponse>,
    pub statistics: RouteStatistics,
    pub average_data: Option<HistoricalAverage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub total_records: usize,
    pub data: Vec<TripRecordResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummaryResponse {
    pub total_routes: usize,
    pub routes: Vec<RouteSummary>,
}

/// The three shapes `GET /api/route-costs` can answer with.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RouteCostsBody {
    Route(RouteHistoryResponse),
    Export(ExportResponse),
    Summary(RouteSummaryResponse),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutliersResponse {
    pub route: String,
    pub total_outliers: usize,
    pub data: Vec<TripRecordResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub route: String,
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(flatten)]
    pub estimate: CostEstimate,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub total_records: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}
