pub mod next_stop;

pub use next_stop::{get_next_stop, RouteCompletedResponse};

use axum::{routing::get, Router};

use crate::providers::Directory;
use crate::tracking::LocationStore;

#[derive(Clone)]
pub struct VehiclesState {
    pub directory: Directory,
    pub store: LocationStore,
    pub floor_speed_kmh: f64,
}

pub fn router(directory: Directory, store: LocationStore, floor_speed_kmh: f64) -> Router {
    let state = VehiclesState {
        directory,
        store,
        floor_speed_kmh,
    };
    Router::new()
        .route("/{id}/next-stop", get(get_next_stop))
        .with_state(state)
}
