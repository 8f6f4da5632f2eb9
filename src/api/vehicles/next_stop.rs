use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::VehiclesState;
use crate::api::{internal_error, not_found, ErrorResponse};
use crate::tracking::eta::{self, EtaOutcome, NextStopEta};
use crate::tracking::GeoPoint;

/// Terminal state: the trip's elapsed time is past every stop's offset
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteCompletedResponse {
    pub message: String,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<GeoPoint>,
}

/// Next stop and arrival estimate for a vehicle's active trip
#[utoipa::path(
    get,
    path = "/api/vehicles/{id}/next-stop",
    params(
        ("id" = String, Path, description = "Vehicle id")
    ),
    responses(
        (status = 200, description = "Next-stop estimate, or a route-completed body once no stop remains", body = NextStopEta),
        (status = 404, description = "Vehicle has no trip in progress", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn get_next_stop(
    State(state): State<VehiclesState>,
    Path(vehicle_id): Path<String>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let trip = state
        .directory
        .active_trip(&vehicle_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| not_found("No trip in progress for this vehicle"))?;

    let stops = state
        .directory
        .route_stops(trip.route_id)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let position = state.store.latest_for_vehicle(&vehicle_id).await;

    let outcome = eta::estimate(
        &trip,
        &stops,
        position.as_ref(),
        Utc::now(),
        state.floor_speed_kmh,
    );

    match outcome {
        EtaOutcome::NextStop(estimate) => Ok(Json(estimate).into_response()),
        EtaOutcome::RouteCompleted {
            last_updated,
            current_location,
        } => Ok(Json(RouteCompletedResponse {
            message: "Route completed for this trip".to_string(),
            last_updated: last_updated.unwrap_or_else(Utc::now),
            current_location,
        })
        .into_response()),
    }
}
