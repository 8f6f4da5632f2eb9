//! The real-time vehicle tracking core.
//!
//! This module handles:
//! - Bookkeeping for live streaming connections (registry)
//! - Fan-out of position updates to all live connections (bus)
//! - Validation and normalization of inbound reports (ingest)
//! - A TTL-bounded cache of the latest location per source (store)
//! - Next-stop arrival estimation against a trip's schedule (eta)

pub mod bus;
pub mod eta;
pub mod ingest;
pub mod protocol;
pub mod registry;
pub mod store;
pub mod types;

pub use bus::BroadcastBus;
pub use ingest::ValidationError;
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{Connection, ConnectionMetadata, ConnectionRegistry};
pub use store::LocationStore;
pub use types::{GeoPoint, LocationRecord, Position, RawLocation};
