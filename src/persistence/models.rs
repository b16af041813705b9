//! Wire model of mutation notifications published by the CRUD service.

use serde::Deserialize;

use crate::domain::{
    BoardId, Entity, Mutation, MutationKind, SanitizedBoard, SanitizedCard, SanitizedColumn,
    SanitizedTag, UserId,
};
use crate::error::HubError;

/// Payload of one `pg_notify` call.
///
/// ```json
/// {"boardId":5,"type":"created","card":{...},"actorId":7}
/// ```
///
/// Exactly one of the entity fields must be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    /// Board whose channel receives the mutation.
    pub board_id: u64,
    /// Kind of committed change.
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Board entity, when a board changed.
    pub board: Option<SanitizedBoard>,
    /// Column entity, when a column changed.
    pub column: Option<SanitizedColumn>,
    /// Card entity, when a card changed.
    pub card: Option<SanitizedCard>,
    /// Tag entity, when a tag changed.
    pub tag: Option<SanitizedTag>,
    /// User who made the change, if known.
    pub actor_id: Option<u64>,
}

impl MutationRecord {
    /// Decodes a notification payload straight into a [`Mutation`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidPayload`] if the payload is not valid
    /// JSON of this shape or does not carry exactly one entity.
    pub fn decode(payload: &str) -> Result<Mutation, HubError> {
        serde_json::from_str::<Self>(payload)
            .map_err(|e| HubError::InvalidPayload(e.to_string()))?
            .try_into()
    }
}

impl TryFrom<MutationRecord> for Mutation {
    type Error = HubError;

    fn try_from(record: MutationRecord) -> Result<Self, Self::Error> {
        let entity = match (record.board, record.column, record.card, record.tag) {
            (Some(board), None, None, None) => Entity::Board(board),
            (None, Some(column), None, None) => Entity::Column(column),
            (None, None, Some(card), None) => Entity::Card(card),
            (None, None, None, Some(tag)) => Entity::Tag(tag),
            _ => {
                return Err(HubError::InvalidPayload(
                    "expected exactly one of board, column, card, tag".to_string(),
                ));
            }
        };
        let mutation = Self::new(BoardId::new(record.board_id), record.kind, entity);
        Ok(match record.actor_id {
            Some(actor) => mutation.with_actor(UserId::new(actor)),
            None => mutation,
        })
    }
}
