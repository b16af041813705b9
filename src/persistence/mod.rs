//! Persistence layer: PostgreSQL collaborators of the hub.
//!
//! Two pieces talk to the database the CRUD service writes to. The board
//! access check reads membership rows, and the mutation listener turns
//! `pg_notify` payloads published after commit into hub events. Both are
//! optional; without `DATABASE_URL` the service runs with
//! [`crate::hub::DenyAll`] and no listener.

pub mod listener;
pub mod models;
pub mod postgres;

pub use listener::MutationListener;
pub use models::MutationRecord;
pub use postgres::{PostgresBoardAccess, connect};
