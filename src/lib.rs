//! # taskboard-hub
//!
//! Real-time event hub of the task-board service.
//!
//! Authenticated clients open a WebSocket, join `board_<id>` channels for
//! the boards they belong to, and receive every committed change to those
//! boards along with join/leave/presence notifications. Board data itself
//! lives in the CRUD service; this crate only routes notifications.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)          CRUD service
//!     │                            │ pg_notify
//!     ├── auth middleware (api/)   │
//!     ├── WS handler (ws/)         ├── MutationListener (persistence/)
//!     │     reader / writer /      │
//!     │     heartbeat tasks        │
//!     │                            │
//!     └──────── HubHandle ─────────┘
//!                  │ ordered inbound queue
//!                  ▼
//!              Hub (hub/) ── BoardAccess (PostgreSQL)
//!                  │
//!                  ▼ per-connection outbound queues
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod persistence;
pub mod ws;
