//! Inbound events consumed by the hub.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::domain::{Mutation, SessionId};
use crate::ws::connection::ConnectionHandle;

/// One unit of work for the hub. Consumed exactly once, in queue order.
#[derive(Debug)]
pub enum HubEvent {
    /// A connection finished its upgrade and wants to be known.
    Register(Arc<ConnectionHandle>),
    /// A connection is going away.
    Unregister(SessionId),
    /// Subscribe `session` to the channel named `channel`.
    Join {
        /// Requesting session.
        session: SessionId,
        /// Raw channel name as sent by the client.
        channel: String,
    },
    /// Unsubscribe `session` from the channel named `channel`.
    Leave {
        /// Requesting session.
        session: SessionId,
        /// Raw channel name as sent by the client.
        channel: String,
    },
    /// `session` sent a liveness probe.
    Ping(SessionId),
    /// `session` acknowledged a liveness probe.
    Pong(SessionId),
    /// The storage layer committed a change.
    Mutation(Mutation),
    /// Snapshot request answered on the given channel.
    Stats(oneshot::Sender<HubStats>),
}

impl From<Mutation> for HubEvent {
    fn from(mutation: Mutation) -> Self {
        Self::Mutation(mutation)
    }
}

/// Point-in-time counters of the hub state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Registered connections.
    pub connections: usize,
    /// Channels with at least one member.
    pub channels: usize,
    /// Total (session, channel) memberships.
    pub subscriptions: usize,
}
