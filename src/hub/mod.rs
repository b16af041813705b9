//! The real-time event hub.
//!
//! [`Hub`] is the single owner of the connection registry and of channel
//! membership. Every other task talks to it through a [`HubHandle`], which
//! feeds one ordered inbound queue of [`HubEvent`]s. Because only the hub
//! task mutates that state, none of it needs a lock.

pub mod access;
pub mod event;
pub mod event_loop;
pub mod handle;

pub use access::{BoardAccess, DenyAll, MemoryBoardAccess};
pub use event::{HubEvent, HubStats};
pub use event_loop::Hub;
pub use handle::HubHandle;
