use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::{not_found, ErrorResponse};
use crate::tracking::{LocationRecord, LocationStore};

#[derive(Clone)]
pub struct LocationsState {
    pub store: LocationStore,
}

/// All cached locations, one per reporting source
#[utoipa::path(
    get,
    path = "/api/locations",
    responses(
        (status = 200, description = "Latest location per reporting source", body = [LocationRecord])
    ),
    tag = "locations"
)]
pub async fn list_locations(State(state): State<LocationsState>) -> Json<Vec<LocationRecord>> {
    Json(state.store.all().await)
}

/// The cached location for one reporting source
#[utoipa::path(
    get,
    path = "/api/locations/{id}",
    params(
        ("id" = String, Path, description = "Reporting source (connection) id")
    ),
    responses(
        (status = 200, description = "Latest location for the source", body = LocationRecord),
        (status = 404, description = "No location cached for this source", body = ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<LocationsState>,
    Path(id): Path<String>,
) -> Result<Json<LocationRecord>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("Location not found"))
}

pub fn router(store: LocationStore) -> Router {
    let state = LocationsState { store };
    Router::new()
        .route("/", get(list_locations))
        .route("/{id}", get(get_location))
        .with_state(state)
}
