//! Next-stop determination and arrival estimation.
//!
//! The schedule context is the trip's start time plus its accumulated delay;
//! the next stop is the first one whose scheduled offset lies ahead of the
//! elapsed time. The ETA blends two projections and takes the larger:
//! schedule-only collapses under accumulated delay, distance-only degrades
//! with stale GPS, and the max of the two never reports an arrival early.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::types::{GeoPoint, LocationRecord};

/// Ordered stop on a route. Order in the route's stop sequence is the sole
/// signal for "next stop" determination.
#[derive(Debug, Clone)]
pub struct RouteStop {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Scheduled offset in minutes from the route origin
    pub scheduled_offset_minutes: f64,
}

/// The schedule context of an in-progress trip, as resolved by the trip
/// collaborator.
#[derive(Debug, Clone)]
pub struct ActiveTrip {
    pub trip_id: i64,
    pub route_id: i64,
    pub vehicle_id: String,
    pub start_time: DateTime<Utc>,
    /// Accumulated delay in minutes
    pub delay_minutes: f64,
}

/// The next unreached stop with its arrival estimate
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextStop {
    pub name: String,
    pub location: GeoPoint,
    pub scheduled_arrival_time: DateTime<Utc>,
    pub eta_minutes: f64,
}

/// One computed estimate. Produced per query, never cached.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextStopEta {
    pub next_stop: NextStop,
    /// Position the estimate was computed from, if one was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<GeoPoint>,
    /// False when no stored location existed and the estimate is
    /// schedule-only
    pub position_available: bool,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of an estimate for a trip that was successfully resolved
#[derive(Debug, Clone)]
pub enum EtaOutcome {
    NextStop(NextStopEta),
    /// Elapsed time exceeds every stop's offset; no next stop remains
    RouteCompleted {
        last_updated: Option<DateTime<Utc>>,
        current_location: Option<GeoPoint>,
    },
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Estimate the next stop and arrival time for a trip.
///
/// A missing stored position degrades to a schedule-only projection marked
/// `position_available: false` rather than failing the query. A route with
/// zero stops is completed by definition.
pub fn estimate(
    trip: &ActiveTrip,
    stops: &[RouteStop],
    position: Option<&LocationRecord>,
    now: DateTime<Utc>,
    floor_speed_kmh: f64,
) -> EtaOutcome {
    let elapsed_minutes =
        (now - trip.start_time).num_seconds() as f64 / 60.0 + trip.delay_minutes;

    let Some(stop) = stops
        .iter()
        .find(|stop| stop.scheduled_offset_minutes > elapsed_minutes)
    else {
        return EtaOutcome::RouteCompleted {
            last_updated: position.map(|record| record.timestamp),
            current_location: position.map(|record| record.geo_point()),
        };
    };

    let schedule_eta = stop.scheduled_offset_minutes - elapsed_minutes;
    let eta_minutes = match position {
        Some(record) => {
            let distance_km = haversine_km(
                record.location.latitude,
                record.location.longitude,
                stop.latitude,
                stop.longitude,
            );
            let distance_eta = if floor_speed_kmh > 0.0 {
                distance_km / floor_speed_kmh * 60.0
            } else {
                0.0
            };
            schedule_eta.max(distance_eta)
        }
        None => schedule_eta,
    }
    .max(0.0);

    let offset_with_delay = stop.scheduled_offset_minutes + trip.delay_minutes;
    let scheduled_arrival_time =
        trip.start_time + Duration::seconds((offset_with_delay * 60.0).round() as i64);

    EtaOutcome::NextStop(NextStopEta {
        next_stop: NextStop {
            name: stop.name.clone(),
            location: GeoPoint::new(stop.longitude, stop.latitude),
            scheduled_arrival_time,
            eta_minutes,
        },
        current_location: position.map(|record| record.geo_point()),
        position_available: position.is_some(),
        last_updated: position.map(|record| record.timestamp).unwrap_or(now),
    })
}
