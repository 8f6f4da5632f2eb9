//! In-memory TTL cache of the most recent location per reporting source.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::TrackingConfig;

use super::types::LocationRecord;

/// Location cache keyed by source (connection) id. Writes are unconditional
/// overwrites: a newer report is always preferred regardless of timestamp
/// skew. Entries outlive their connection and are only removed by the sweep.
#[derive(Clone, Default)]
pub struct LocationStore {
    inner: Arc<RwLock<HashMap<String, LocationRecord>>>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, record: LocationRecord) {
        self.inner
            .write()
            .await
            .insert(record.client_id.clone(), record);
    }

    pub async fn get(&self, source_id: &str) -> Option<LocationRecord> {
        self.inner.read().await.get(source_id).cloned()
    }

    pub async fn all(&self) -> Vec<LocationRecord> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Most recent record attributed to the given vehicle, across all
    /// sources. Linear in the number of live sources.
    pub async fn latest_for_vehicle(&self, vehicle_id: &str) -> Option<LocationRecord> {
        self.inner
            .read()
            .await
            .values()
            .filter(|record| record.vehicle_id.as_deref() == Some(vehicle_id))
            .max_by_key(|record| record.timestamp)
            .cloned()
    }

    /// Remove every record older than `max_age`. Returns the eviction count.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        self.sweep_at(max_age, Utc::now()).await
    }

    async fn sweep_at(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let mut records = self.inner.write().await;
        let before = records.len();
        records.retain(|_, record| record.age(now) <= max_age);
        before - records.len()
    }

    /// Spawn the periodic eviction sweep. Runs for the life of the process,
    /// independent of any connection.
    pub fn spawn_sweeper(&self, config: &TrackingConfig) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let period = std::time::Duration::from_secs(config.sweep_interval_minutes * 60);
        let max_age = Duration::minutes(config.location_ttl_minutes as i64);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the immediate first tick; a fresh store has nothing to evict
            interval.tick().await;

            loop {
                interval.tick().await;
                let evicted = store.sweep(max_age).await;
                if evicted > 0 {
                    info!(evicted, "Evicted stale location records");
                } else {
                    debug!("Location sweep found nothing to evict");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::Position;

    fn make_record(source_id: &str, latitude: f64, timestamp: DateTime<Utc>) -> LocationRecord {
        LocationRecord {
            client_id: source_id.to_string(),
            vehicle_id: None,
            location: Position {
                latitude,
                longitude: 10.89,
                accuracy: 0.0,
                speed: 0.0,
                heading: 0.0,
            },
            metadata: serde_json::json!({}),
            timestamp,
        }
    }

    #[tokio::test]
    async fn get_returns_what_was_put() {
        let store = LocationStore::new();
        store.put(make_record("c1", 48.37, Utc::now())).await;

        let record = store.get("c1").await.unwrap();
        assert_eq!(record.location.latitude, 48.37);
        assert!(store.get("c2").await.is_none());
    }

    #[tokio::test]
    async fn newer_put_overwrites_without_merging() {
        let store = LocationStore::new();
        let now = Utc::now();
        store.put(make_record("c1", 48.37, now)).await;
        store
            .put(make_record("c1", 48.38, now + Duration::seconds(5)))
            .await;

        let record = store.get("c1").await.unwrap();
        assert_eq!(record.location.latitude, 48.38);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_records() {
        let store = LocationStore::new();
        let now = Utc::now();
        store
            .put(make_record("old", 48.37, now - Duration::minutes(45)))
            .await;
        store
            .put(make_record("fresh", 48.38, now - Duration::minutes(5)))
            .await;

        let evicted = store.sweep_at(Duration::minutes(30), now).await;
        assert_eq!(evicted, 1);
        assert!(store.get("old").await.is_none());
        assert!(store.get("fresh").await.is_some());

        // Nothing new to evict on an immediate second sweep
        assert_eq!(store.sweep_at(Duration::minutes(30), now).await, 0);
    }

    #[tokio::test]
    async fn latest_for_vehicle_picks_newest_matching_record() {
        let store = LocationStore::new();
        let now = Utc::now();

        let mut older = make_record("c1", 48.30, now - Duration::seconds(60));
        older.vehicle_id = Some("bus-12".to_string());
        let mut newer = make_record("c2", 48.40, now);
        newer.vehicle_id = Some("bus-12".to_string());
        let mut other = make_record("c3", 48.50, now);
        other.vehicle_id = Some("bus-99".to_string());

        store.put(older).await;
        store.put(newer).await;
        store.put(other).await;

        let record = store.latest_for_vehicle("bus-12").await.unwrap();
        assert_eq!(record.client_id, "c2");
        assert!(store.latest_for_vehicle("bus-7").await.is_none());
    }
}
