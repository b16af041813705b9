//! WebSocket layer: upgrade, per-connection tasks, wire messages.
//!
//! The endpoint at `/ws` accepts authenticated upgrades. Each connection
//! runs a reader, a writer and a heartbeat monitor, and talks to the hub
//! only through [`crate::hub::HubHandle`].

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod messages;
