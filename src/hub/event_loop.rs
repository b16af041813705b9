//! The hub event loop: sole owner of the registry and channel membership.
//!
//! [`Hub::run`] drains the inbound queue one event at a time. Each event is
//! applied to the registry/membership maps and every notification it
//! produces is enqueued on the recipients' outbound queues before the next
//! event is read, so all members of a channel see that channel's
//! notifications in the same order.
//!
//! Outbound writes use `try_send` and never wait on a client. A recipient
//! whose queue is full is closed; its own teardown then unregisters it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{BoardAccess, HubEvent, HubHandle, HubStats};
use crate::config::HubConfig;
use crate::domain::{Channel, Mutation, SessionId};
use crate::error::HubError;
use crate::ws::connection::ConnectionHandle;
use crate::ws::messages::ServerMessage;

/// The event hub.
///
/// Generic over the [`BoardAccess`] check so tests and deployments without
/// a database can plug in their own.
#[derive(Debug)]
pub struct Hub<A> {
    access: A,
    config: HubConfig,
    inbound: mpsc::Receiver<HubEvent>,
    connections: HashMap<SessionId, Arc<ConnectionHandle>>,
    channels: HashMap<Channel, HashSet<SessionId>>,
}

impl<A: BoardAccess> Hub<A> {
    /// Creates a hub and the handle producers use to reach it.
    #[must_use]
    pub fn new(access: A, config: HubConfig) -> (Self, HubHandle) {
        let (handle, inbound) = HubHandle::channel(config.queue_capacity);
        let hub = Self {
            access,
            config,
            inbound,
            connections: HashMap::new(),
            channels: HashMap::new(),
        };
        (hub, handle)
    }

    /// Processes events until `shutdown` is cancelled or every
    /// [`HubHandle`] is dropped, then unregisters every remaining session.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("hub started");
        loop {
            let event = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                event = self.inbound.recv() => event,
            };
            match event {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
        self.shutdown();
        tracing::info!("hub stopped");
    }

    /// Applies one inbound event.
    pub async fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(connection) => self.register(connection),
            HubEvent::Unregister(session) => self.unregister(session),
            HubEvent::Join { session, channel } => self.join(session, &channel).await,
            HubEvent::Leave { session, channel } => self.leave(session, &channel),
            HubEvent::Ping(session) => self.ping(session),
            HubEvent::Pong(session) => self.pong(session),
            HubEvent::Mutation(mutation) => self.mutation(mutation),
            HubEvent::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Returns `true` if `session` is registered.
    #[must_use]
    pub fn is_registered(&self, session: SessionId) -> bool {
        self.connections.contains_key(&session)
    }

    /// Returns `true` if `session` is a member of `channel`.
    #[must_use]
    pub fn is_member(&self, session: SessionId, channel: Channel) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|members| members.contains(&session))
    }

    /// Channels `session` currently belongs to.
    #[must_use]
    pub fn channels_of(&self, session: SessionId) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|(_, members)| members.contains(&session))
            .map(|(channel, _)| *channel)
            .collect()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.connections.len(),
            channels: self.channels.values().filter(|m| !m.is_empty()).count(),
            subscriptions: self.channels.values().map(HashSet::len).sum(),
        }
    }

    fn register(&mut self, connection: Arc<ConnectionHandle>) {
        let session = connection.session();
        let user = connection.user();
        if self.connections.contains_key(&session) {
            tracing::warn!(%session, %user, "duplicate session rejected");
            // The rejected transport must not unregister the live session.
            connection.begin_disconnect();
            connection.close();
            return;
        }

        self.connections.insert(session, connection);
        tracing::debug!(%session, %user, "session registered");
        self.broadcast_global(&ServerMessage::register(user), Some(session));
    }

    fn unregister(&mut self, session: SessionId) {
        let Some(connection) = self.connections.get(&session).map(Arc::clone) else {
            return;
        };
        let user = connection.user();

        for channel in self.channels_of(session) {
            if let Some(members) = self.channels.get_mut(&channel) {
                members.remove(&session);
            }
            self.broadcast_channel(channel, &ServerMessage::leave(channel, user), |_| true);
        }

        self.connections.remove(&session);
        self.broadcast_global(&ServerMessage::unregister(user), None);

        connection.begin_disconnect();
        connection.close();
        tracing::debug!(%session, %user, "session unregistered");
    }

    async fn join(&mut self, session: SessionId, name: &str) {
        let Some(user) = self.connections.get(&session).map(|c| c.user()) else {
            return;
        };
        let Some(channel) = Channel::parse(name) else {
            tracing::debug!(%session, channel = name, "join to unknown channel rejected");
            return;
        };
        if self.is_member(session, channel) {
            return;
        }

        let board = channel.board_id();
        let allowed = tokio::time::timeout(
            self.config.access_timeout,
            self.access.has_board_access(user, board),
        )
        .await
        .unwrap_or(Err(HubError::AccessCheckTimeout));
        match allowed {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%session, %user, %channel, "join denied");
                return;
            }
            Err(err) => {
                tracing::warn!(%session, %user, %channel, error = %err, "access check failed, join denied");
                return;
            }
        }

        // No other event ran during the check, so the session is still registered.
        self.channels.entry(channel).or_default().insert(session);
        tracing::debug!(%session, %user, %channel, "joined");
        self.broadcast_channel(channel, &ServerMessage::join(channel, user), |_| true);
    }

    fn leave(&mut self, session: SessionId, name: &str) {
        let Some(user) = self.connections.get(&session).map(|c| c.user()) else {
            return;
        };
        let Some(channel) = Channel::parse(name) else {
            return;
        };
        let removed = self
            .channels
            .get_mut(&channel)
            .is_some_and(|members| members.remove(&session));
        if !removed {
            return;
        }

        tracing::debug!(%session, %user, %channel, "left");
        self.broadcast_channel(channel, &ServerMessage::leave(channel, user), |_| true);
    }

    fn ping(&self, session: SessionId) {
        if let Some(connection) = self.connections.get(&session)
            && let Some(frame) = encode(&ServerMessage::pong())
        {
            connection.send_or_close(frame);
        }
    }

    fn pong(&self, session: SessionId) {
        if let Some(connection) = self.connections.get(&session) {
            connection.acknowledge();
        }
    }

    fn mutation(&self, mutation: Mutation) {
        let channel = Channel::from(mutation.board_id);
        let skip_actor = if self.config.echo_to_actor {
            None
        } else {
            mutation.actor
        };
        tracing::debug!(
            %channel,
            kind = mutation.kind.as_str(),
            entity = mutation.entity.kind_str(),
            "broadcasting mutation"
        );
        let message = ServerMessage::mutation(channel, mutation.kind, mutation.entity);
        self.broadcast_channel(channel, &message, |connection| {
            skip_actor != Some(connection.user())
        });
    }

    fn shutdown(&mut self) {
        self.inbound.close();
        let sessions: Vec<SessionId> = self.connections.keys().copied().collect();
        tracing::info!(sessions = sessions.len(), "closing remaining sessions");
        for session in sessions {
            self.unregister(session);
        }
    }

    /// Sends `message` to every member of `channel` accepted by `filter`.
    fn broadcast_channel(
        &self,
        channel: Channel,
        message: &ServerMessage,
        filter: impl Fn(&ConnectionHandle) -> bool,
    ) {
        let Some(members) = self.channels.get(&channel) else {
            return;
        };
        if members.is_empty() {
            return;
        }
        let Some(frame) = encode(message) else {
            return;
        };
        for session in members {
            if let Some(connection) = self.connections.get(session)
                && filter(connection)
            {
                connection.send_or_close(Arc::clone(&frame));
            }
        }
    }

    /// Sends `message` to every registered connection except `except`.
    fn broadcast_global(&self, message: &ServerMessage, except: Option<SessionId>) {
        let Some(frame) = encode(message) else {
            return;
        };
        for (session, connection) in &self.connections {
            if Some(*session) != except {
                connection.send_or_close(Arc::clone(&frame));
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match message.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode notification");
            None
        }
    }
}
