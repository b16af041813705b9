//! Named broadcast scopes.
//!
//! Only board scopes have a name on the wire (`board_<id>`). The global
//! scope covering every registered connection is implicit and handled by
//! the hub directly, so it has no [`Channel`] value.

use std::fmt;

use serde::{Serialize, Serializer};

use super::BoardId;

/// Prefix of every board channel name.
pub const BOARD_CHANNEL_PREFIX: &str = "board_";

/// A named broadcast scope clients can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Notifications scoped to one board. Joining requires board access.
    Board(BoardId),
}

impl Channel {
    /// Parses a channel name as sent by a client.
    ///
    /// Returns `None` for any name that is not the canonical form of a known
    /// channel kind. `board_05` and `board_+5` are rejected so that a board
    /// has exactly one channel name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(BOARD_CHANNEL_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(|id| Self::Board(BoardId::new(id)))
    }

    /// Returns the board this channel is scoped to.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        match self {
            Self::Board(id) => *id,
        }
    }
}

impl From<BoardId> for Channel {
    fn from(id: BoardId) -> Self {
        Self::Board(id)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(id) => write!(f, "{BOARD_CHANNEL_PREFIX}{id}"),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
