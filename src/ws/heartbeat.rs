//! Heartbeat ping/pong liveness monitoring.
//!
//! One monitor runs per connection. Every `ping_interval` it sends an
//! application-level `ping`, unless the previous one is still unanswered.
//! A `ping` left unanswered for `ack_timeout` closes the connection.

use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};

use super::connection::{ConnectionHandle, disconnect};
use super::messages::ServerMessage;
use crate::config::HeartbeatConfig;
use crate::hub::HubHandle;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The peer did not answer a `ping` in time; the monitor closed it.
    TimedOut,
    /// The connection closed for another reason.
    Closed,
}

/// Runs the liveness state machine until the connection closes.
///
/// `deadline` is `None` while waiting for the next interval and
/// `Some(instant)` while a `ping` awaits its `pong`.
pub async fn run_heartbeat(
    connection: Arc<ConnectionHandle>,
    hub: HubHandle,
    config: HeartbeatConfig,
) -> HeartbeatResult {
    let session = connection.session();
    let mut ticker = time::interval_at(
        Instant::now() + config.ping_interval,
        config.ping_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            () = connection.closed() => return HeartbeatResult::Closed,
            () = connection.acknowledged() => {
                deadline = None;
            }
            () = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracing::warn!(%session, timeout = ?config.ack_timeout, "heartbeat timed out");
                disconnect(&connection, &hub).await;
                return HeartbeatResult::TimedOut;
            }
            _ = ticker.tick() => {
                if deadline.is_some() {
                    continue;
                }
                if let Err(err) = connection.send_message(&ServerMessage::ping()) {
                    tracing::debug!(%session, error = %err, "ping not sent");
                }
                deadline = Some(Instant::now() + config.ack_timeout);
            }
        }
    }
}
