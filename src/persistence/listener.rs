//! Bridge from `pg_notify` to the hub.
//!
//! The CRUD service calls `pg_notify(channel, payload)` after each commit.
//! [`MutationListener`] holds a `LISTEN` on that channel and forwards every
//! decoded payload to [`HubHandle::notify_mutation`]. Postgres only
//! delivers notifications of committed transactions, so nothing reaches the
//! hub before the change is durable.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;

use super::models::MutationRecord;
use crate::error::HubError;
use crate::hub::HubHandle;

/// Pause between reconnect attempts after the listener fails.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-running `LISTEN` task feeding mutations to the hub.
#[derive(Debug)]
pub struct MutationListener {
    pool: PgPool,
    channel: String,
    hub: HubHandle,
}

impl MutationListener {
    /// Creates a listener for `channel`.
    #[must_use]
    pub const fn new(pool: PgPool, channel: String, hub: HubHandle) -> Self {
        Self { pool, channel, hub }
    }

    /// Listens until `shutdown` is cancelled or the hub stops, reconnecting
    /// after [`RETRY_DELAY`] whenever the database connection fails.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            match self.listen(&shutdown).await {
                Ok(()) => break,
                Err(err) => {
                    tracing::warn!(channel = %self.channel, error = %err, "mutation listener failed, retrying");
                }
            }
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(RETRY_DELAY) => {}
            }
        }
        tracing::info!(channel = %self.channel, "mutation listener stopped");
    }

    /// One listening session. `Ok` means stop for good.
    async fn listen(&self, shutdown: &CancellationToken) -> Result<(), HubError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;
        tracing::info!(channel = %self.channel, "listening for mutations");

        loop {
            let notification = tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                notification = listener.recv() => notification?,
            };
            let mutation = match MutationRecord::decode(notification.payload()) {
                Ok(mutation) => mutation,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping undecodable mutation payload");
                    continue;
                }
            };
            if self.hub.notify_mutation(mutation).await.is_err() {
                tracing::info!("hub stopped, mutation listener exiting");
                return Ok(());
            }
        }
    }
}
