pub mod error;
pub mod locations;
pub mod status;
pub mod vehicles;
pub mod ws;

pub use error::{internal_error, not_found, ErrorResponse};

use axum::{routing::get, Router};

use crate::config::TrackingConfig;
use crate::providers::Directory;
use crate::tracking::{BroadcastBus, ConnectionRegistry, LocationStore};

pub fn router(
    registry: ConnectionRegistry,
    store: LocationStore,
    bus: BroadcastBus,
    directory: Directory,
    tracking: &TrackingConfig,
) -> Router {
    let ws_state = ws::WsState {
        registry: registry.clone(),
        store: store.clone(),
        bus,
        directory: directory.clone(),
        outbound_queue_capacity: tracking.outbound_queue_capacity,
    };

    Router::new()
        .nest("/status", status::router(registry))
        .nest("/locations", locations::router(store.clone()))
        .nest(
            "/vehicles",
            vehicles::router(directory, store, tracking.floor_speed_kmh),
        )
        .route("/ws/locations", get(ws::ws_locations).with_state(ws_state))
}
