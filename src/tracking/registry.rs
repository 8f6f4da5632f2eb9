//! Bookkeeping for live streaming connections.
//!
//! The registry owns connection metadata only; all socket I/O stays with the
//! per-connection tasks. Delivery goes through each connection's bounded
//! outbound queue, whose sender is stored here so the broadcast bus can
//! snapshot the live set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use super::protocol::ServerMessage;
use super::types::Position;

pub type ConnectionId = String;

/// Per-connection metadata, refreshed on every accepted location report
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    pub last_location: Option<Position>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One live streaming session
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub metadata: ConnectionMetadata,
    outbound: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub(crate) fn sender(&self) -> mpsc::Sender<ServerMessage> {
        self.outbound.clone()
    }
}

/// Registry of live connections, keyed by connection id
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ConnectionId, Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its id. A caller-supplied id is used
    /// only if it does not collide with a live entry; the registry is the
    /// source of truth for uniqueness.
    pub async fn register(
        &self,
        preferred_id: Option<String>,
        outbound: mpsc::Sender<ServerMessage>,
    ) -> ConnectionId {
        let now = Utc::now();
        let mut connections = self.inner.write().await;

        let id = match preferred_id {
            Some(id) if !id.is_empty() && !connections.contains_key(&id) => id,
            _ => Uuid::new_v4().to_string(),
        };

        connections.insert(
            id.clone(),
            Connection {
                id: id.clone(),
                connected_at: now,
                last_activity: now,
                metadata: ConnectionMetadata::default(),
                outbound,
            },
        );
        id
    }

    /// Remove a connection. Idempotent: returns false if the id was absent.
    pub async fn unregister(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn get(&self, id: &str) -> Option<Connection> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Connection> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Bump a connection's last-activity timestamp. Returns false if absent.
    pub async fn touch(&self, id: &str) -> bool {
        let mut connections = self.inner.write().await;
        match connections.get_mut(id) {
            Some(conn) => {
                conn.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Merge a metadata patch into a connection's metadata. Fields left as
    /// `None` in the patch keep their current value. Returns whether the
    /// patch was applied.
    pub async fn update_metadata(&self, id: &str, patch: ConnectionMetadata) -> bool {
        let mut connections = self.inner.write().await;
        match connections.get_mut(id) {
            Some(conn) => {
                if let Some(location) = patch.last_location {
                    conn.metadata.last_location = Some(location);
                }
                if let Some(updated) = patch.last_updated {
                    conn.metadata.last_updated = Some(updated);
                }
                conn.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Snapshot of the live outbound senders, for fan-out.
    pub(crate) async fn senders(&self) -> Vec<(ConnectionId, mpsc::Sender<ServerMessage>)> {
        self.inner
            .read()
            .await
            .values()
            .map(|conn| (conn.id.clone(), conn.sender()))
            .collect()
    }

    pub(crate) async fn sender(&self, id: &str) -> Option<mpsc::Sender<ServerMessage>> {
        self.inner.read().await.get(id).map(|conn| conn.sender())
    }
}
