//! Board access check used when a session joins a board channel.

use std::collections::HashSet;
use std::future::Future;
use std::sync::RwLock;

use crate::domain::{BoardId, UserId};
use crate::error::HubError;

/// Answers "is this user currently a member of this board".
///
/// Called once per join request, never cached by the hub. An `Err` is
/// treated as a denial.
pub trait BoardAccess: Send + Sync + 'static {
    /// Returns whether `user` may see `board` right now.
    ///
    /// # Errors
    ///
    /// Returns a [`HubError`] when the answer cannot be determined.
    fn has_board_access(
        &self,
        user: UserId,
        board: BoardId,
    ) -> impl Future<Output = Result<bool, HubError>> + Send;
}

/// Denies every request. Used when no storage is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl BoardAccess for DenyAll {
    async fn has_board_access(&self, _user: UserId, _board: BoardId) -> Result<bool, HubError> {
        Ok(false)
    }
}

/// In-process membership table.
///
/// Useful for local development and tests where no database is available.
#[derive(Debug, Default)]
pub struct MemoryBoardAccess {
    members: RwLock<HashSet<(UserId, BoardId)>>,
}

impl MemoryBoardAccess {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `user` a member of `board`.
    pub fn grant(&self, user: UserId, board: BoardId) {
        if let Ok(mut members) = self.members.write() {
            members.insert((user, board));
        }
    }

    /// Removes `user` from `board`.
    pub fn revoke(&self, user: UserId, board: BoardId) {
        if let Ok(mut members) = self.members.write() {
            members.remove(&(user, board));
        }
    }
}

impl BoardAccess for MemoryBoardAccess {
    async fn has_board_access(&self, user: UserId, board: BoardId) -> Result<bool, HubError> {
        self.members
            .read()
            .map(|members| members.contains(&(user, board)))
            .map_err(|e| HubError::AccessCheck(e.to_string()))
    }
}

impl<T: BoardAccess> BoardAccess for std::sync::Arc<T> {
    fn has_board_access(
        &self,
        user: UserId,
        board: BoardId,
    ) -> impl Future<Output = Result<bool, HubError>> + Send {
        (**self).has_board_access(user, board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deny_all_denies() {
        let access = DenyAll;
        let allowed = access
            .has_board_access(UserId::new(1), BoardId::new(1))
            .await;
        assert!(matches!(allowed, Ok(false)));
    }

    #[tokio::test]
    async fn memory_access_tracks_grants_and_revocations() {
        let access = MemoryBoardAccess::new();
        let (user, board) = (UserId::new(7), BoardId::new(5));
        assert!(matches!(access.has_board_access(user, board).await, Ok(false)));

        access.grant(user, board);
        assert!(matches!(access.has_board_access(user, board).await, Ok(true)));
        assert!(matches!(
            access.has_board_access(user, BoardId::new(6)).await,
            Ok(false)
        ));

        access.revoke(user, board);
        assert!(matches!(access.has_board_access(user, board).await, Ok(false)));
    }
}
