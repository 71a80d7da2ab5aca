use crate::api::SharedCalculator;
use crate::api::requests::{EstimateQuery, RegisterTripRequest, RouteQuery, RouteQueryMode};
use crate::api::responses::{
    ErrorCode, ErrorResponse, EstimateResponse, ExportResponse, HealthResponse, HealthStatus,
    OutliersResponse, RegisterTripResponse, RouteCostsBody, RouteHistoryResponse,
    RouteSummaryResponse, TripRecordResponse,
};
use crate::error::AppError;
use crate::ledger::{RouteKey, TripRecord};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success {
        status: StatusCode,
        body: T,
    },
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(state): State<SharedCalculator>) -> impl IntoResponse {
    build_health_response(state, SystemTime::now())
}

pub async fn register_trip(
    State(state): State<SharedCalculator>,
    payload: Result<Json<RegisterTripRequest>, JsonRejection>,
) -> impl IntoResponse {
    let now = SystemTime::now();
    match payload {
        Ok(Json(request)) => build_register_response(state, request, now),
        Err(rejection) => invalid_input(rejection.body_text(), now),
    }
}

pub async fn get_route_costs(
    State(state): State<SharedCalculator>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> impl IntoResponse {
    let now = SystemTime::now();
    match query {
        Ok(Query(query)) => build_route_costs_response(state, query, now),
        Err(rejection) => invalid_input(rejection.body_text(), now),
    }
}

pub async fn get_estimate(
    State(state): State<SharedCalculator>,
    query: Result<Query<EstimateQuery>, QueryRejection>,
) -> impl IntoResponse {
    let now = SystemTime::now();
    match query {
        Ok(Query(query)) => build_estimate_response(state, query, now),
        Err(rejection) => invalid_input(rejection.body_text(), now),
    }
}

pub async fn get_outliers(
    State(state): State<SharedCalculator>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> impl IntoResponse {
    let now = SystemTime::now();
    match query {
        Ok(Query(query)) => build_outliers_response(state, query, now),
        Err(rejection) => invalid_input(rejection.body_text(), now),
    }
}

fn build_health_response(state: SharedCalculator, now: SystemTime) -> ApiResponse<HealthResponse> {
    let total_records = match state.read() {
        Ok(guard) => guard.total_records(),
        Err(_) => return app_error(AppError::StateLock, now),
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: StatusCode::OK,
            body: HealthResponse {
                status: HealthStatus::Ok,
                total_records,
                timestamp,
            },
        },
        Err(_) => internal_error("timestamp formatting failure"),
    }
}

fn build_register_response(
    state: SharedCalculator,
    request: RegisterTripRequest,
    now: SystemTime,
) -> ApiResponse<RegisterTripResponse> {
    let input = match request.validate() {
        Ok(input) => input,
        Err(err) => return app_error(err, now),
    };

    let mut guard = match state.write() {
        Ok(guard) => guard,
        Err(_) => return app_error(AppError::StateLock, now),
    };
    let record = guard.register_route_data_at(input, now);
    let statistics = guard.route_statistics(&record.origin, &record.destination);
    let average_data = guard.average_cost_from_history(
        &record.origin,
        &record.destination,
        Some(&record.vehicle_id),
    );
    drop(guard);

    info!(
        route = %record.route_key(),
        vehicle_id = %record.vehicle_id,
        trips = statistics.count,
        confidence = ?statistics.confidence,
        "Trip registered"
    );

    match trip_record_response(&record) {
        Ok(data) => ApiResponse::Success {
            status: StatusCode::CREATED,
            body: RegisterTripResponse {
                message: "Route data registered".to_string(),
                data,
                statistics,
                average_data,
            },
        },
        Err(_) => internal_error("timestamp formatting failure"),
    }
}

fn build_route_costs_response(
    state: SharedCalculator,
    query: RouteQuery,
    now: SystemTime,
) -> ApiResponse<RouteCostsBody> {
    let mode = match query.mode() {
        Ok(mode) => mode,
        Err(err) => return app_error(err, now),
    };

    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => return app_error(AppError::StateLock, now),
    };

    let body = match mode {
        RouteQueryMode::ExportAll => {
            let records = guard.export_historical_data();
            drop(guard);
            match trip_record_responses(&records) {
                Ok(data) => RouteCostsBody::Export(ExportResponse {
                    total_records: data.len(),
                    data,
                }),
                Err(_) => return internal_error("timestamp formatting failure"),
            }
        }
        RouteQueryMode::Route {
            origin,
            destination,
            vehicle_id,
        } => {
            let mut records = guard.historical_data(&origin, &destination);
            let statistics = guard.route_statistics(&origin, &destination);
            let average_data =
                guard.average_cost_from_history(&origin, &destination, vehicle_id.as_deref());
            drop(guard);
            if let Some(vehicle_id) = vehicle_id.as_deref() {
                records.retain(|record| record.vehicle_id == vehicle_id);
            }
            match trip_record_responses(&records) {
                Ok(data) => RouteCostsBody::Route(RouteHistoryResponse {
                    route: RouteKey::new(&origin, &destination).to_string(),
                    total_trips: data.len(),
                    data,
                    statistics,
                    average_data,
                }),
                Err(_) => return internal_error("timestamp formatting failure"),
            }
        }
        RouteQueryMode::Summary => {
            let routes = guard.route_summaries();
            drop(guard);
            RouteCostsBody::Summary(RouteSummaryResponse {
                total_routes: routes.len(),
                routes,
            })
        }
    };

    ApiResponse::Success {
        status: StatusCode::OK,
        body,
    }
}

fn build_estimate_response(
    state: SharedCalculator,
    query: EstimateQuery,
    now: SystemTime,
) -> ApiResponse<EstimateResponse> {
    let request = match query.validate() {
        Ok(request) => request,
        Err(err) => return app_error(err, now),
    };

    let result = match state.read() {
        Ok(guard) => guard.estimate(
            &request.origin,
            &request.destination,
            request.distance,
            request.vehicle_id.as_deref(),
        ),
        Err(_) => return app_error(AppError::StateLock, now),
    };

    match result {
        Ok(estimate) => ApiResponse::Success {
            status: StatusCode::OK,
            body: EstimateResponse {
                route: RouteKey::new(&request.origin, &request.destination).to_string(),
                distance: request.distance,
                vehicle_id: request.vehicle_id,
                estimate,
            },
        },
        Err(err) => app_error(err, now),
    }
}

fn build_outliers_response(
    state: SharedCalculator,
    query: RouteQuery,
    now: SystemTime,
) -> ApiResponse<OutliersResponse> {
    let (origin, destination) = match query.route() {
        Ok(route) => route,
        Err(err) => return app_error(err, now),
    };

    let outliers = match state.read() {
        Ok(guard) => guard.route_outliers(&origin, &destination),
        Err(_) => return app_error(AppError::StateLock, now),
    };

    match trip_record_responses(&outliers) {
        Ok(data) => ApiResponse::Success {
            status: StatusCode::OK,
            body: OutliersResponse {
                route: RouteKey::new(&origin, &destination).to_string(),
                total_outliers: data.len(),
                data,
            },
        },
        Err(_) => internal_error("timestamp formatting failure"),
    }
}

fn trip_record_response(record: &TripRecord) -> Result<TripRecordResponse, TimestampError> {
    Ok(TripRecordResponse {
        origin: record.origin.clone(),
        destination: record.destination.clone(),
        distance: record.distance,
        actual_cost: record.actual_cost,
        fuel_consumed: record.fuel_consumed,
        duration: record.duration,
        date: format_timestamp(record.date)?,
        vehicle_id: record.vehicle_id.clone(),
        issues: record.issues.clone(),
        cost_per_km: record.cost_per_km(),
    })
}

fn trip_record_responses(
    records: &[TripRecord],
) -> Result<Vec<TripRecordResponse>, TimestampError> {
    records.iter().map(trip_record_response).collect()
}

fn app_error<T>(err: AppError, now: SystemTime) -> ApiResponse<T> {
    match err {
        AppError::InvalidInput(message) => invalid_input(message, now),
        AppError::StateLock => internal_error("state lock poisoned while handling request"),
    }
}

fn invalid_input<T>(message: String, now: SystemTime) -> ApiResponse<T> {
    warn!(message = %message, "Rejected invalid request");
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error_code: ErrorCode::InvalidInput,
                error_message: message,
                timestamp,
            },
        },
        Err(_) => internal_error("timestamp formatting failure"),
    }
}

fn internal_error<T>(message: &str) -> ApiResponse<T> {
    error!(message = message, "Internal error while handling route-cost request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::RouteCostCalculator;
    use crate::estimation::EstimateBasis;
    use crate::ledger::TripRecordInput;
    use crate::stats::Confidence;
    use std::sync::{Arc, RwLock};
    use std::time::{Duration, UNIX_EPOCH};

    fn shared(calculator: RouteCostCalculator) -> SharedCalculator {
        Arc::new(RwLock::new(calculator))
    }

    fn poisoned() -> SharedCalculator {
        let state = shared(RouteCostCalculator::new());
        let state_for_thread = Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _guard = state_for_thread.write().expect("lock for poison");
            panic!("poison lock");
        })
        .join();
        state
    }

    fn seeded() -> SharedCalculator {
        let mut calculator = RouteCostCalculator::new();
        for (index, (cost, vehicle)) in [(300.0, "V1"), (310.0, "V2"), (305.0, "V1")]
            .into_iter()
            .enumerate()
        {
            calculator.register_route_data_at(
                TripRecordInput {
                    origin: "Lyon".to_string(),
                    destination: "Paris".to_string(),
                    distance: 100.0,
                    actual_cost: cost,
                    vehicle_id: vehicle.to_string(),
                    ..TripRecordInput::default()
                },
                UNIX_EPOCH + Duration::from_secs(index as u64 + 1),
            );
        }
        shared(calculator)
    }

    fn register_request() -> RegisterTripRequest {
        RegisterTripRequest {
            origin: Some("Lyon".to_string()),
            destination: Some("Paris".to_string()),
            distance: Some(100.0),
            actual_cost: Some(250.0),
            vehicle_id: Some("V1".to_string()),
            issues: Some(vec!["traffic".to_string()]),
            ..RegisterTripRequest::default()
        }
    }

    #[test]
    fn register_returns_created_with_statistics() {
        let state = shared(RouteCostCalculator::new());

        let response =
            build_register_response(state, register_request(), UNIX_EPOCH + Duration::from_secs(1));

        match response {
            ApiResponse::Success { status, body } => {
                assert_eq!(status, StatusCode::CREATED);
                assert_eq!(body.data.origin, "lyon");
                assert_eq!(body.data.cost_per_km, 2.5);
                assert_eq!(body.data.date, "1970-01-01T00:00:01Z");
                assert_eq!(body.statistics.count, 1);
                assert_eq!(body.average_data.map(|a| a.sample_size), Some(1));
            }
            ApiResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
    }

    #[test]
    fn register_rejects_non_positive_distance() {
        let state = shared(RouteCostCalculator::new());
        let mut request = register_request();
        request.distance = Some(0.0);

        let response = build_register_response(Arc::clone(&state), request, UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_code, ErrorCode::InvalidInput);
                assert_eq!(body.timestamp, "1970-01-01T00:00:00Z");
            }
            ApiResponse::Success { .. } => panic!("expected invalid input response"),
        }
        assert_eq!(state.read().expect("read state").total_records(), 0);
    }

    #[test]
    fn register_returns_internal_error_when_lock_poisoned() {
        let response = build_register_response(poisoned(), register_request(), UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error_code, ErrorCode::InternalError);
                assert_eq!(body.error_message, "Internal server error");
            }
            ApiResponse::Success { .. } => panic!("expected internal error response"),
        }
    }

    #[test]
    fn route_query_filters_data_by_vehicle() {
        let query = RouteQuery {
            origin: Some("lyon".to_string()),
            destination: Some("PARIS".to_string()),
            vehicle_id: Some("V1".to_string()),
            export: None,
        };

        let response = build_route_costs_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Success {
                body: RouteCostsBody::Route(body),
                ..
            } => {
                assert_eq!(body.route, "lyon -> paris");
                assert_eq!(body.total_trips, 2);
                assert_eq!(body.statistics.count, 3);
                assert_eq!(body.statistics.confidence, Confidence::Medium);
                assert_eq!(body.average_data.map(|a| a.sample_size), Some(2));
            }
            _ => panic!("expected route history response"),
        }
    }

    #[test]
    fn route_query_for_unknown_route_is_empty_not_error() {
        let query = RouteQuery {
            origin: Some("Nowhere".to_string()),
            destination: Some("Elsewhere".to_string()),
            ..RouteQuery::default()
        };

        let response = build_route_costs_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Success {
                status,
                body: RouteCostsBody::Route(body),
            } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body.total_trips, 0);
                assert_eq!(body.statistics.confidence, Confidence::Low);
                assert!(body.average_data.is_none());
            }
            _ => panic!("expected empty route history response"),
        }
    }

    #[test]
    fn export_all_returns_every_record() {
        let query = RouteQuery {
            export: Some("all".to_string()),
            ..RouteQuery::default()
        };

        let response = build_route_costs_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Success {
                body: RouteCostsBody::Export(body),
                ..
            } => {
                assert_eq!(body.total_records, 3);
                assert_eq!(body.data[0].date, "1970-01-01T00:00:01Z");
                assert_eq!(body.data[2].date, "1970-01-01T00:00:03Z");
            }
            _ => panic!("expected export response"),
        }
    }

    #[test]
    fn no_route_returns_summary() {
        let response = build_route_costs_response(seeded(), RouteQuery::default(), UNIX_EPOCH);

        match response {
            ApiResponse::Success {
                body: RouteCostsBody::Summary(body),
                ..
            } => {
                assert_eq!(body.total_routes, 1);
                assert_eq!(body.routes[0].trip_count, 3);
                assert_eq!(body.routes[0].vehicle_count, 2);
            }
            _ => panic!("expected summary response"),
        }
    }

    #[test]
    fn half_route_query_is_invalid() {
        let query = RouteQuery {
            destination: Some("Paris".to_string()),
            ..RouteQuery::default()
        };

        let response = build_route_costs_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_message, "origin is required");
            }
            ApiResponse::Success { .. } => panic!("expected invalid input response"),
        }
    }

    #[test]
    fn estimate_uses_history_when_trusted() {
        let query = EstimateQuery {
            origin: Some("Lyon".to_string()),
            destination: Some("Paris".to_string()),
            distance: Some(200.0),
            vehicle_id: None,
        };

        let response = build_estimate_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Success { body, .. } => {
                assert_eq!(body.estimate.basis, EstimateBasis::HistoricalAverage);
                assert_eq!(body.estimate.sample_size, 3);
                assert!((body.estimate.estimated_cost - 610.0).abs() < 1e-9);
            }
            ApiResponse::Error { status, .. } => panic!("expected estimate, got {status}"),
        }
    }

    #[test]
    fn estimate_rejects_zero_distance() {
        let query = EstimateQuery {
            origin: Some("Lyon".to_string()),
            destination: Some("Paris".to_string()),
            distance: Some(0.0),
            vehicle_id: None,
        };

        let response = build_estimate_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_code, ErrorCode::InvalidInput);
            }
            ApiResponse::Success { .. } => panic!("expected invalid input response"),
        }
    }

    #[test]
    fn estimate_rejects_distance_that_would_overflow() {
        let query = EstimateQuery {
            origin: Some("Lyon".to_string()),
            destination: Some("Paris".to_string()),
            distance: Some(1e308),
            vehicle_id: None,
        };

        let response = build_estimate_response(seeded(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_code, ErrorCode::InvalidInput);
            }
            ApiResponse::Success { .. } => panic!("expected invalid input response"),
        }
    }

    #[test]
    fn estimate_returns_internal_error_when_lock_poisoned() {
        let query = EstimateQuery {
            origin: Some("Lyon".to_string()),
            destination: Some("Paris".to_string()),
            distance: Some(10.0),
            vehicle_id: None,
        };

        let response = build_estimate_response(poisoned(), query, UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error_code, ErrorCode::InternalError);
                assert_eq!(body.error_message, "Internal server error");
            }
            ApiResponse::Success { .. } => panic!("expected internal error response"),
        }
    }

    #[test]
    fn outliers_require_route() {
        let response = build_outliers_response(seeded(), RouteQuery::default(), UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_message, "origin is required");
            }
            ApiResponse::Success { .. } => panic!("expected invalid input response"),
        }
    }

    #[test]
    fn health_reports_record_count() {
        let response = build_health_response(seeded(), UNIX_EPOCH + Duration::from_secs(2));

        match response {
            ApiResponse::Success { status, body } => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body.status, HealthStatus::Ok);
                assert_eq!(body.total_records, 3);
                assert_eq!(body.timestamp, "1970-01-01T00:00:02Z");
            }
            ApiResponse::Error { status, .. } => panic!("expected health, got {status}"),
        }
    }

    #[test]
    fn health_returns_internal_error_when_lock_poisoned() {
        let response = build_health_response(poisoned(), UNIX_EPOCH);

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.error_code, ErrorCode::InternalError);
            }
            ApiResponse::Success { .. } => panic!("expected internal error response"),
        }
    }
}
