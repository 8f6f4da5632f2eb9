//! Type definitions for the tracking core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A GeoJSON-style point. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub point_type: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            point_type: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A validated, normalized position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported GPS accuracy in meters (0 if not reported)
    pub accuracy: f64,
    /// Speed in km/h (0 if not reported)
    pub speed: f64,
    /// Heading in degrees (0 if not reported)
    pub heading: f64,
}

/// A raw position report as received from a streaming client, before
/// validation. Coordinates are optional here so a missing field can be
/// reported as such instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    /// Vehicle this report is attributed to, if the client is a driver app
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    /// Free-form metadata passed through to observers
    pub metadata: Option<serde_json::Value>,
}

/// The latest known location for one reporting source. At most one record
/// per source survives; a newer report always overwrites an older one.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// Connection id of the reporting source
    pub client_id: String,
    /// Vehicle the report was attributed to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub location: Position,
    pub metadata: serde_json::Value,
    /// When the report was received and stored
    pub timestamp: DateTime<Utc>,
}

impl LocationRecord {
    /// Age of this record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }

    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.location.longitude, self.location.latitude)
    }
}
