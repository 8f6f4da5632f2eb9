//! The bidirectional JSON message envelope spoken over the WebSocket.
//!
//! Every frame is an object with a `type` discriminator and a flattened
//! payload: `{ "type": "location", "latitude": ..., ... }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{LocationRecord, RawLocation};

/// Message received from a streaming client
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// A position report
    Location(RawLocation),
    /// Liveness probe; answered with a `pong`
    Ping,
}

/// Message sent to a streaming client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection acknowledgment, sent once on connect
    Connection {
        status: String,
        client_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Reply to a client `ping`
    Pong { timestamp: DateTime<Utc> },
    /// A peer's position report, fanned out to all live connections
    LocationUpdate {
        client_id: String,
        data: LocationRecord,
        timestamp: DateTime<Utc>,
    },
    /// A peer disconnected
    ClientDisconnected {
        client_id: String,
        timestamp: DateTime<Utc>,
    },
    /// Validation failure, sent only to the offending source
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    pub fn connected(client_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self::Connection {
            status: "connected".to_string(),
            client_id: client_id.to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::Position;

    #[test]
    fn parses_location_message_with_flattened_payload() {
        let json = r#"{"type":"location","latitude":48.37,"longitude":10.89,"speed":31.5,"vehicleId":"bus-12"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Location(raw) => {
                assert_eq!(raw.latitude, Some(48.37));
                assert_eq!(raw.longitude, Some(10.89));
                assert_eq!(raw.speed, Some(31.5));
                assert_eq!(raw.vehicle_id.as_deref(), Some("bus-12"));
                assert!(raw.accuracy.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn parses_ping_message() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn rejects_unknown_message_type() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serializes_connection_ack_with_camel_case_tags() {
        let msg = ServerMessage::connected("abc", Utc::now());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"connection""#));
        assert!(json.contains(r#""status":"connected""#));
        assert!(json.contains(r#""clientId":"abc""#));
    }

    #[test]
    fn serializes_location_update_envelope() {
        let record = LocationRecord {
            client_id: "abc".to_string(),
            vehicle_id: None,
            location: Position {
                latitude: 1.0,
                longitude: 2.0,
                accuracy: 0.0,
                speed: 0.0,
                heading: 0.0,
            },
            metadata: serde_json::json!({}),
            timestamp: Utc::now(),
        };
        let msg = ServerMessage::LocationUpdate {
            client_id: "abc".to_string(),
            data: record,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"locationUpdate""#));
        assert!(json.contains(r#""data":{"#));
        // vehicle_id is omitted when absent
        assert!(!json.contains("vehicleId"));
    }

    #[test]
    fn serializes_client_disconnected_tag() {
        let msg = ServerMessage::ClientDisconnected {
            client_id: "abc".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"clientDisconnected""#));
    }
}
