//! The route/trip/vehicle collaborator, backed by SQLite.
//!
//! The tracking core consumes this through three narrow calls: resolve the
//! active trip for a vehicle, load a route's ordered stop list, and refresh
//! a vehicle's last-known position.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::tracking::eta::{ActiveTrip, RouteStop};
use crate::tracking::types::LocationRecord;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, FromRow)]
struct TripRow {
    id: i64,
    route_id: i64,
    vehicle_id: String,
    start_time: DateTime<Utc>,
    delay_minutes: f64,
}

#[derive(Debug, FromRow)]
struct RouteStopRow {
    name: String,
    latitude: f64,
    longitude: f64,
    scheduled_offset_minutes: f64,
}

#[derive(Clone)]
pub struct Directory {
    pool: SqlitePool,
}

impl Directory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The vehicle's in-progress trip, if any. When scheduling overlaps, the
    /// most recently started trip wins.
    pub async fn active_trip(&self, vehicle_id: &str) -> Result<Option<ActiveTrip>, DirectoryError> {
        let row: Option<TripRow> = sqlx::query_as(
            r#"
            SELECT id, route_id, vehicle_id, start_time, delay_minutes
            FROM trips
            WHERE vehicle_id = ? AND status = 'in-progress'
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ActiveTrip {
            trip_id: row.id,
            route_id: row.route_id,
            vehicle_id: row.vehicle_id,
            start_time: row.start_time,
            delay_minutes: row.delay_minutes,
        }))
    }

    /// The route's stops in sequence order.
    pub async fn route_stops(&self, route_id: i64) -> Result<Vec<RouteStop>, DirectoryError> {
        let rows: Vec<RouteStopRow> = sqlx::query_as(
            r#"
            SELECT name, latitude, longitude, scheduled_offset_minutes
            FROM route_stops
            WHERE route_id = ?
            ORDER BY position
            "#,
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RouteStop {
                name: row.name,
                latitude: row.latitude,
                longitude: row.longitude,
                scheduled_offset_minutes: row.scheduled_offset_minutes,
            })
            .collect())
    }

    /// Refresh a vehicle's last-known position from an accepted report.
    /// A vehicle id that matches no row is a silent no-op.
    pub async fn record_vehicle_position(
        &self,
        vehicle_id: &str,
        record: &LocationRecord,
    ) -> Result<(), DirectoryError> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET last_latitude = ?,
                last_longitude = ?,
                last_speed = ?,
                last_heading = ?,
                last_location_update = ?
            WHERE id = ?
            "#,
        )
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(record.location.speed)
        .bind(record.location.heading)
        .bind(record.timestamp)
        .bind(vehicle_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::Position;
    use chrono::Duration;

    async fn make_directory() -> Directory {
        // One connection only: every pooled connection would otherwise open
        // its own empty :memory: database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        Directory::new(pool)
    }

    async fn seed_route(directory: &Directory) -> i64 {
        sqlx::query("INSERT INTO routes (route_number, name) VALUES ('12', 'Central Line')")
            .execute(&directory.pool)
            .await
            .unwrap();
        let route_id: i64 = sqlx::query_scalar("SELECT id FROM routes WHERE route_number = '12'")
            .fetch_one(&directory.pool)
            .await
            .unwrap();

        for (position, offset) in [0.0, 10.0, 25.0].iter().enumerate() {
            sqlx::query(
                "INSERT INTO route_stops (route_id, position, name, latitude, longitude, scheduled_offset_minutes)
                 VALUES (?, ?, ?, 48.37, 10.89, ?)",
            )
            .bind(route_id)
            .bind(position as i64)
            .bind(format!("Stop {}", position + 1))
            .bind(offset)
            .execute(&directory.pool)
            .await
            .unwrap();
        }
        route_id
    }

    async fn seed_vehicle(directory: &Directory, id: &str) {
        sqlx::query("INSERT INTO vehicles (id, vehicle_number) VALUES (?, ?)")
            .bind(id)
            .bind(format!("V-{id}"))
            .execute(&directory.pool)
            .await
            .unwrap();
    }

    async fn seed_trip(
        directory: &Directory,
        route_id: i64,
        vehicle_id: &str,
        status: &str,
        start_time: DateTime<Utc>,
    ) {
        sqlx::query(
            "INSERT INTO trips (route_id, vehicle_id, status, start_time, delay_minutes)
             VALUES (?, ?, ?, ?, 3.0)",
        )
        .bind(route_id)
        .bind(vehicle_id)
        .bind(status)
        .bind(start_time)
        .execute(&directory.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn active_trip_picks_latest_in_progress() {
        let directory = make_directory().await;
        let route_id = seed_route(&directory).await;
        seed_vehicle(&directory, "bus-12").await;

        let now = Utc::now();
        seed_trip(&directory, route_id, "bus-12", "completed", now - Duration::hours(3)).await;
        seed_trip(&directory, route_id, "bus-12", "in-progress", now - Duration::hours(1)).await;
        seed_trip(&directory, route_id, "bus-12", "in-progress", now - Duration::minutes(10)).await;

        let trip = directory.active_trip("bus-12").await.unwrap().unwrap();
        assert_eq!(trip.route_id, route_id);
        assert_eq!(trip.vehicle_id, "bus-12");
        assert_eq!(trip.delay_minutes, 3.0);
        assert!((trip.start_time - (now - Duration::minutes(10))).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn active_trip_ignores_other_statuses() {
        let directory = make_directory().await;
        let route_id = seed_route(&directory).await;
        seed_vehicle(&directory, "bus-12").await;
        seed_trip(&directory, route_id, "bus-12", "scheduled", Utc::now()).await;

        assert!(directory.active_trip("bus-12").await.unwrap().is_none());
        assert!(directory.active_trip("bus-99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn route_stops_come_back_in_sequence_order() {
        let directory = make_directory().await;
        let route_id = seed_route(&directory).await;

        let stops = directory.route_stops(route_id).await.unwrap();
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].name, "Stop 1");
        assert_eq!(stops[2].scheduled_offset_minutes, 25.0);

        assert!(directory.route_stops(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_vehicle_position_updates_the_row() {
        let directory = make_directory().await;
        seed_vehicle(&directory, "bus-12").await;

        let record = LocationRecord {
            client_id: "c1".to_string(),
            vehicle_id: Some("bus-12".to_string()),
            location: Position {
                latitude: 48.40,
                longitude: 10.95,
                accuracy: 3.0,
                speed: 28.0,
                heading: 90.0,
            },
            metadata: serde_json::json!({}),
            timestamp: Utc::now(),
        };
        directory
            .record_vehicle_position("bus-12", &record)
            .await
            .unwrap();

        let (lat, speed): (f64, f64) = sqlx::query_as(
            "SELECT last_latitude, last_speed FROM vehicles WHERE id = 'bus-12'",
        )
        .fetch_one(&directory.pool)
        .await
        .unwrap();
        assert_eq!(lat, 48.40);
        assert_eq!(speed, 28.0);

        // Unknown vehicle is a no-op, not an error
        directory
            .record_vehicle_position("bus-99", &record)
            .await
            .unwrap();
    }
}
