//! Validation and normalization of inbound position reports.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::registry::{ConnectionMetadata, ConnectionRegistry};
use super::store::LocationStore;
use super::types::{LocationRecord, Position, RawLocation};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("Field is not a finite number: {0}")]
    NotANumber(&'static str),
    #[error("Field out of range: {field} = {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Validate a raw report and turn it into the canonical record form.
/// Missing optional fields default to zero; metadata defaults to an empty
/// object. Pure: performs no writes.
pub fn normalize(
    source_id: &str,
    raw: RawLocation,
    received_at: DateTime<Utc>,
) -> Result<LocationRecord, ValidationError> {
    let latitude = require_coordinate("latitude", raw.latitude, 90.0)?;
    let longitude = require_coordinate("longitude", raw.longitude, 180.0)?;

    Ok(LocationRecord {
        client_id: source_id.to_string(),
        vehicle_id: raw.vehicle_id,
        location: Position {
            latitude,
            longitude,
            accuracy: raw.accuracy.unwrap_or(0.0),
            speed: raw.speed.unwrap_or(0.0),
            heading: raw.heading.unwrap_or(0.0),
        },
        metadata: raw.metadata.unwrap_or_else(|| serde_json::json!({})),
        timestamp: received_at,
    })
}

fn require_coordinate(
    field: &'static str,
    value: Option<f64>,
    bound: f64,
) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingRequiredField(field))?;
    if !value.is_finite() {
        return Err(ValidationError::NotANumber(field));
    }
    if value < -bound || value > bound {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(value)
}

/// Validate and apply a position report: overwrite the store entry for this
/// source and refresh the registry metadata if the source is a live
/// connection. On failure nothing is mutated. Broadcasting the returned
/// record is the caller's responsibility.
pub async fn ingest(
    registry: &ConnectionRegistry,
    store: &LocationStore,
    source_id: &str,
    raw: RawLocation,
) -> Result<LocationRecord, ValidationError> {
    let record = normalize(source_id, raw, Utc::now())?;

    store.put(record.clone()).await;
    // The source may be a non-connection reporter; a missed patch is fine
    registry
        .update_metadata(
            source_id,
            ConnectionMetadata {
                last_location: Some(record.location.clone()),
                last_updated: Some(record.timestamp),
            },
        )
        .await;

    Ok(record)
}
