//! Sanitized board entities and the mutations that carry them.
//!
//! The storage layer hands the hub a [`Mutation`] after every committed
//! create/update/delete. The entity inside is already sanitized: it holds
//! only the fields any board member may see, in the camelCase shape clients
//! consume.

use serde::{Deserialize, Serialize};

use super::{BoardId, UserId};

/// Kind of committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Row inserted.
    Created,
    /// Row updated.
    Updated,
    /// Row deleted.
    Deleted,
}

impl MutationKind {
    /// Returns the wire `type` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Public view of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedBoard {
    /// Board key.
    pub id: u64,
    /// Owning user.
    pub owner_id: u64,
    /// Display name.
    pub name: String,
    /// Members of the board.
    #[serde(default)]
    pub user_ids: Vec<u64>,
}

/// Public view of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedColumn {
    /// Column key.
    pub id: u64,
    /// Board the column belongs to.
    pub board_id: u64,
    /// Next sibling, `None` for the last column.
    pub next_id: Option<u64>,
    /// Display name.
    pub name: String,
}

/// Public view of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedCard {
    /// Card key.
    pub id: u64,
    /// Column the card belongs to.
    pub column_id: u64,
    /// Next sibling, `None` for the last card of the column.
    pub next_id: Option<u64>,
    /// Assigned users.
    #[serde(default)]
    pub user_ids: Vec<u64>,
    /// Attached tags.
    #[serde(default)]
    pub tag_ids: Vec<u64>,
    /// Title.
    pub name: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
}

/// Public view of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedTag {
    /// Tag key.
    pub id: u64,
    /// Board the tag belongs to.
    pub board_id: u64,
    /// Label.
    pub name: String,
    /// Display color.
    pub color: String,
}

/// A sanitized entity, serialized under its kind key
/// (`{"card": {...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    /// A board.
    Board(SanitizedBoard),
    /// A column.
    Column(SanitizedColumn),
    /// A card.
    Card(SanitizedCard),
    /// A tag.
    Tag(SanitizedTag),
}

impl Entity {
    /// Returns the entity kind as a static string slice.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Board(_) => "board",
            Self::Column(_) => "column",
            Self::Card(_) => "card",
            Self::Tag(_) => "tag",
        }
    }
}

/// A committed change on one board, as delivered by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Board whose channel receives the notification.
    pub board_id: BoardId,
    /// What happened to the entity.
    pub kind: MutationKind,
    /// Sanitized entity after (or, for deletes, before) the change.
    pub entity: Entity,
    /// User whose request caused the change, when known.
    pub actor: Option<UserId>,
}

impl Mutation {
    /// Creates a mutation with no known actor.
    #[must_use]
    pub const fn new(board_id: BoardId, kind: MutationKind, entity: Entity) -> Self {
        Self {
            board_id,
            kind,
            entity,
            actor: None,
        }
    }

    /// Attaches the acting user.
    #[must_use]
    pub const fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }
}
