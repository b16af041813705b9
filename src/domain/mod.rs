//! Domain layer: identifiers, channels and board mutations.
//!
//! These types carry no I/O. The hub, the WebSocket layer and the storage
//! bridge all speak in terms of them.

pub mod channel;
pub mod entity;
pub mod ids;

pub use channel::{BOARD_CHANNEL_PREFIX, Channel};
pub use entity::{
    Entity, Mutation, MutationKind, SanitizedBoard, SanitizedCard, SanitizedColumn, SanitizedTag,
};
pub use ids::{BoardId, SessionId, UserId};
