//! WebSocket connection lifecycle.
//!
//! Each upgraded socket is split in two. The read half stays in the
//! upgrade task ([`run_connection`]), which decodes client frames and feeds
//! the hub. The write half moves into a dedicated writer task that drains
//! the connection's outbound queue, so frames coming from the hub, the
//! heartbeat and the local `pong` echo are written one at a time.
//!
//! Peer close, read/write failure, heartbeat timeout and server shutdown
//! all end in [`disconnect`], which emits `Unregister` at most once.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::heartbeat::run_heartbeat;
use super::messages::{ClientCommand, ServerMessage};
use crate::config::ConnectionConfig;
use crate::domain::{SessionId, UserId};
use crate::error::HubError;
use crate::hub::{HubEvent, HubHandle};

/// Time a closing connection gets to flush its queue and send the close
/// frame before the socket is dropped.
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Item of a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON text frame, shared between all recipients.
    Text(Arc<str>),
    /// Send a close frame and stop writing.
    Close,
}

/// Transport handle of one connection.
///
/// Shared between the connection's own tasks and the hub registry. Writes
/// never touch the socket directly; they enqueue into the writer task.
#[derive(Debug)]
pub struct ConnectionHandle {
    session: SessionId,
    user: UserId,
    outbound: mpsc::Sender<Outbound>,
    closed: CancellationToken,
    ack: Notify,
    disconnecting: AtomicBool,
}

impl ConnectionHandle {
    /// Creates a handle and the outbound receiver its writer drains.
    ///
    /// `closed` is cancelled when the connection closes; pass a child of
    /// the server shutdown token so shutdown reaches every connection.
    #[must_use]
    pub fn new(
        session: SessionId,
        user: UserId,
        capacity: usize,
        closed: CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (outbound, receiver) = mpsc::channel(capacity);
        let handle = Self {
            session,
            user,
            outbound,
            closed,
            ack: Notify::new(),
            disconnecting: AtomicBool::new(false),
        };
        (Arc::new(handle), receiver)
    }

    /// Session id of this connection.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Authenticated user of this connection.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// Enqueues a serialized frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::ConnectionBacklogged`] if the outbound queue is
    /// full, or [`HubError::ConnectionClosed`] if the writer has stopped.
    pub fn send_frame(&self, frame: Arc<str>) -> Result<(), HubError> {
        if self.closed.is_cancelled() {
            return Err(HubError::ConnectionClosed(self.session));
        }
        self.outbound
            .try_send(Outbound::Text(frame))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => HubError::ConnectionBacklogged(self.session),
                mpsc::error::TrySendError::Closed(_) => HubError::ConnectionClosed(self.session),
            })
    }

    /// Enqueues a frame, closing the connection if its peer is not keeping
    /// up. A closed connection silently drops the frame.
    pub fn send_or_close(&self, frame: Arc<str>) {
        match self.send_frame(frame) {
            Ok(()) | Err(HubError::ConnectionClosed(_)) => {}
            Err(err) => {
                tracing::warn!(session = %self.session, error = %err, "closing slow connection");
                self.close();
            }
        }
    }

    /// Serializes and enqueues a message.
    ///
    /// # Errors
    ///
    /// See [`ConnectionHandle::send_frame`]; also fails on serialization.
    pub fn send_message(&self, message: &ServerMessage) -> Result<(), HubError> {
        self.send_frame(Arc::from(message.to_json()?))
    }

    /// Records a `pong` from the peer for the heartbeat monitor.
    pub fn acknowledge(&self) {
        self.ack.notify_one();
    }

    /// Resolves on the next acknowledgment (or one recorded since the last
    /// wait).
    pub async fn acknowledged(&self) {
        self.ack.notified().await;
    }

    /// Closes the transport. Idempotent.
    ///
    /// Queues a close frame behind anything already queued, then signals
    /// every task of the connection to stop.
    pub fn close(&self) {
        let _ = self.outbound.try_send(Outbound::Close);
        self.closed.cancel();
    }

    /// Returns `true` once [`ConnectionHandle::close`] ran or the server is
    /// shutting down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves when the connection is closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Claims the right to emit `Unregister` for this connection.
    ///
    /// Returns `true` for exactly one caller over the connection's life.
    pub fn begin_disconnect(&self) -> bool {
        !self.disconnecting.swap(true, Ordering::AcqRel)
    }
}

/// Tears down a connection from any trigger.
///
/// Closes the transport and, if no teardown is already under way, tells the
/// hub to unregister the session.
pub async fn disconnect(handle: &ConnectionHandle, hub: &HubHandle) {
    handle.close();
    if !handle.begin_disconnect() {
        return;
    }
    if hub
        .send(HubEvent::Unregister(handle.session()))
        .await
        .is_err()
    {
        tracing::debug!(session = %handle.session(), "hub stopped before unregister");
    }
}

/// Runs the full lifecycle of one upgraded socket.
///
/// Registers with the hub, spawns the writer and heartbeat tasks, then
/// reads client frames until the connection ends for any reason.
pub async fn run_connection(
    socket: WebSocket,
    session: SessionId,
    user: UserId,
    hub: HubHandle,
    config: ConnectionConfig,
    shutdown: CancellationToken,
) {
    let (sink, mut stream) = socket.split();
    let closed = shutdown.child_token();
    let (handle, outbound_rx) =
        ConnectionHandle::new(session, user, config.queue_capacity, closed.clone());
    let writer = tokio::spawn(write_loop(sink, outbound_rx, closed, session));

    tracing::info!(%session, %user, "ws connection opened");

    if hub.send(HubEvent::Register(Arc::clone(&handle))).await.is_err() {
        tracing::warn!(%session, "hub unavailable, dropping connection");
        handle.close();
        join_writer(writer, session).await;
        return;
    }

    let heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&handle),
        hub.clone(),
        config.heartbeat,
    ));

    loop {
        let frame = tokio::select! {
            () = handle.closed() => break,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if handle_text(&handle, &hub, text.as_str()).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                tracing::debug!(%session, error = %err, "ws read failed");
                break;
            }
        }
    }

    disconnect(&handle, &hub).await;
    let _ = heartbeat.await;
    join_writer(writer, session).await;
    tracing::info!(%session, %user, "ws connection closed");
}

/// Dispatches one client text frame. Malformed frames are dropped.
async fn handle_text(
    handle: &ConnectionHandle,
    hub: &HubHandle,
    text: &str,
) -> Result<(), HubError> {
    let session = handle.session();
    let command = match ClientCommand::parse(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::debug!(%session, error = %err, "dropping inbound frame");
            return Ok(());
        }
    };

    match command {
        ClientCommand::Join(channel) => hub.send(HubEvent::Join { session, channel }).await,
        ClientCommand::Leave(channel) => hub.send(HubEvent::Leave { session, channel }).await,
        ClientCommand::Ping => {
            match ServerMessage::pong().to_json() {
                Ok(pong) => handle.send_or_close(Arc::from(pong)),
                Err(err) => tracing::error!(%session, error = %err, "failed to encode pong"),
            }
            Ok(())
        }
        ClientCommand::Pong => {
            handle.acknowledge();
            Ok(())
        }
    }
}

/// Sole writer of a socket. Drains the outbound queue until a close frame,
/// connection close or write failure.
///
/// A write never outlives the connection: once `closed` fires, a pending
/// write is abandoned, and the final flush plus close frame get at most
/// [`CLOSE_GRACE`]. The sink is dropped on return.
async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Outbound>,
    closed: CancellationToken,
    session: SessionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let next = tokio::select! {
            biased;
            next = outbound.recv() => next,
            () = closed.cancelled() => break,
        };
        let Some(Outbound::Text(frame)) = next else {
            break;
        };
        let sent = tokio::select! {
            biased;
            sent = sink.send(Message::text(frame.to_string())) => sent,
            () = closed.cancelled() => break,
        };
        if let Err(err) = sent {
            tracing::debug!(%session, error = %err, "ws write failed");
            closed.cancel();
            return;
        }
    }
    closed.cancel();

    let flush = async {
        while let Ok(Outbound::Text(frame)) = outbound.try_recv() {
            sink.send(Message::text(frame.to_string())).await?;
        }
        sink.send(Message::Close(None)).await
    };
    match time::timeout(CLOSE_GRACE, flush).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(%session, error = %err, "close frame not sent"),
        Err(_) => tracing::debug!(%session, "peer not reading, dropping socket"),
    }
}

/// Waits for the writer to release the sink, aborting it if it overruns.
async fn join_writer(writer: JoinHandle<()>, session: SessionId) {
    let abort = writer.abort_handle();
    if time::timeout(CLOSE_GRACE * 2, writer).await.is_err() {
        tracing::warn!(%session, "writer did not stop, aborting");
        abort.abort();
    }
}
