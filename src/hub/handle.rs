//! Producer side of the hub inbound queue.
//!
//! [`HubHandle`] wraps a bounded [`tokio::sync::mpsc`] sender. Connection
//! tasks and the storage bridge each hold a clone; the hub owns the single
//! receiver, so every event lands in one FIFO order.

use tokio::sync::{mpsc, oneshot};

use super::{HubEvent, HubStats};
use crate::domain::Mutation;
use crate::error::HubError;

/// Cloneable sender into the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Creates a queue with the given capacity, returning the producer
    /// handle and the receiver the hub drains.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<HubEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueues an event, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the hub has stopped.
    pub async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.sender.send(event).await.map_err(|_| HubError::HubClosed)
    }

    /// Hands a committed mutation to the hub.
    ///
    /// Waits only for queue space, never for delivery. Once this returns
    /// `Ok` the hub will process the mutation.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the hub has stopped.
    pub async fn notify_mutation(&self, mutation: Mutation) -> Result<(), HubError> {
        self.send(mutation.into()).await
    }

    /// Non-blocking variant of [`HubHandle::notify_mutation`] for callers
    /// that must not wait, such as synchronous commit hooks.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubBusy`] if the queue is full or
    /// [`HubError::HubClosed`] if the hub has stopped. In both cases the
    /// mutation was not accepted.
    pub fn try_notify_mutation(&self, mutation: Mutation) -> Result<(), HubError> {
        self.sender.try_send(mutation.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => HubError::HubBusy,
            mpsc::error::TrySendError::Closed(_) => HubError::HubClosed,
        })
    }

    /// Asks the hub for a snapshot of its counters.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the hub has stopped or dropped the
    /// request.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, response) = oneshot::channel();
        self.send(HubEvent::Stats(reply)).await?;
        response.await.map_err(|_| HubError::HubClosed)
    }

    /// Returns `true` once the hub has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{BoardId, Entity, MutationKind, SanitizedBoard};

    fn mutation() -> Mutation {
        Mutation::new(
            BoardId::new(1),
            MutationKind::Updated,
            Entity::Board(SanitizedBoard {
                id: 1,
                owner_id: 1,
                name: "Roadmap".to_string(),
                user_ids: vec![1],
            }),
        )
    }

    #[tokio::test]
    async fn notify_reaches_receiver() {
        let (handle, mut rx) = HubHandle::channel(4);
        tokio_test::assert_ok!(handle.notify_mutation(mutation()).await);
        let Some(HubEvent::Mutation(m)) = rx.recv().await else {
            panic!("expected mutation event");
        };
        assert_eq!(m.board_id, BoardId::new(1));
    }

    #[test]
    fn try_notify_reports_full_queue() {
        let (handle, _rx) = HubHandle::channel(1);
        tokio_test::assert_ok!(handle.try_notify_mutation(mutation()));
        assert!(matches!(
            handle.try_notify_mutation(mutation()),
            Err(HubError::HubBusy)
        ));
    }

    #[tokio::test]
    async fn closed_hub_is_reported() {
        let (handle, rx) = HubHandle::channel(4);
        drop(rx);
        assert!(handle.is_closed());
        let err = tokio_test::assert_err!(handle.notify_mutation(mutation()).await);
        assert!(matches!(err, HubError::HubClosed));
        assert!(matches!(handle.stats().await, Err(HubError::HubClosed)));
    }
}
