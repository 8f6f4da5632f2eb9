//! Fan-out of server messages to live connections.
//!
//! Each connection drains its own bounded queue, so a slow reader never
//! stalls delivery to the others. A connection whose queue is full or whose
//! receiver is gone is treated as implicitly disconnected and unregistered;
//! the failure is never surfaced to the publisher.

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::protocol::ServerMessage;
use super::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct BroadcastBus {
    registry: ConnectionRegistry,
}

impl BroadcastBus {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver a message to every connection live at call time. Connections
    /// registered after the snapshot is taken do not receive this message.
    /// Returns the number of connections the message was queued for.
    pub async fn publish(&self, message: &ServerMessage) -> usize {
        let targets = self.registry.senders().await;
        let mut delivered = 0;

        for (id, sender) in targets {
            match sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => self.drop_connection(&id, &err).await,
            }
        }
        delivered
    }

    /// Deliver a message to exactly one connection if it is live. Returns
    /// whether delivery was queued.
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> bool {
        let Some(sender) = self.registry.sender(id).await else {
            return false;
        };
        match sender.try_send(message) {
            Ok(()) => true,
            Err(err) => {
                self.drop_connection(id, &err).await;
                false
            }
        }
    }

    /// Announce a peer's disconnect to everyone still connected.
    pub async fn announce_disconnect(&self, client_id: &str) {
        self.publish(&ServerMessage::ClientDisconnected {
            client_id: client_id.to_string(),
            timestamp: Utc::now(),
        })
        .await;
    }

    /// A send failure is an implicit disconnect for that connection only.
    /// Unregistering drops the registry's sender; once the last clone goes,
    /// the connection's writer task observes the closed queue and tears the
    /// socket down.
    async fn drop_connection(&self, id: &str, err: &TrySendError<ServerMessage>) {
        match err {
            TrySendError::Full(_) => {
                warn!(client_id = %id, "Outbound queue full, disconnecting slow client")
            }
            TrySendError::Closed(_) => {
                debug!(client_id = %id, "Outbound queue closed, dropping connection")
            }
        }
        self.registry.unregister(id).await;
    }
}
