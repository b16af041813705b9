//! WebSocket wire messages: inbound commands and outbound notifications.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound frames
//! decode into the closed [`ClientCommand`] enum; anything that does not fit
//! becomes a [`FrameError`] and is dropped by the reader.

use serde::{Deserialize, Serialize};

use crate::domain::{Channel, Entity, MutationKind, UserId};

/// Discriminator for every frame the hub understands or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Client subscribes to a channel / server announces a member.
    Join,
    /// Client unsubscribes / server announces a departure.
    Leave,
    /// Liveness probe, either direction.
    Ping,
    /// Liveness acknowledgment, either direction.
    Pong,
    /// A user connected.
    Register,
    /// A user disconnected.
    Unregister,
    /// An entity was created.
    Created,
    /// An entity was updated.
    Updated,
    /// An entity was deleted.
    Deleted,
}

impl From<MutationKind> for MessageType {
    fn from(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Created => Self::Created,
            MutationKind::Updated => Self::Updated,
            MutationKind::Deleted => Self::Deleted,
        }
    }
}

/// Server → client frame.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Channel the notification is scoped to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    /// User the notification is about, if any.
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Sanitized entity for mutation notifications.
    #[serde(flatten)]
    pub entity: Option<Entity>,
}

impl ServerMessage {
    const fn bare(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            channel: None,
            user_id: None,
            entity: None,
        }
    }

    /// `{"type":"ping"}`
    #[must_use]
    pub const fn ping() -> Self {
        Self::bare(MessageType::Ping)
    }

    /// `{"type":"pong"}`
    #[must_use]
    pub const fn pong() -> Self {
        Self::bare(MessageType::Pong)
    }

    /// Global notice that `user` connected.
    #[must_use]
    pub fn register(user: UserId) -> Self {
        Self {
            user_id: Some(user),
            ..Self::bare(MessageType::Register)
        }
    }

    /// Global notice that `user` disconnected.
    #[must_use]
    pub fn unregister(user: UserId) -> Self {
        Self {
            user_id: Some(user),
            ..Self::bare(MessageType::Unregister)
        }
    }

    /// Channel notice that `user` joined.
    #[must_use]
    pub fn join(channel: Channel, user: UserId) -> Self {
        Self {
            channel: Some(channel),
            user_id: Some(user),
            ..Self::bare(MessageType::Join)
        }
    }

    /// Channel notice that `user` left.
    #[must_use]
    pub fn leave(channel: Channel, user: UserId) -> Self {
        Self {
            channel: Some(channel),
            user_id: Some(user),
            ..Self::bare(MessageType::Leave)
        }
    }

    /// Channel notice carrying a committed mutation.
    #[must_use]
    pub fn mutation(channel: Channel, kind: MutationKind, entity: Entity) -> Self {
        Self {
            channel: Some(channel),
            entity: Some(entity),
            ..Self::bare(kind.into())
        }
    }

    /// Serializes the message to its JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Client → server command after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Subscribe to a channel. The name is validated by the hub.
    Join(String),
    /// Unsubscribe from a channel.
    Leave(String),
    /// Liveness probe; answered locally with `pong`.
    Ping,
    /// Acknowledgment of a server `ping`.
    Pong,
}

/// Reasons an inbound frame is discarded.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Frame is not a JSON object.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field is absent or not a string.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// The `type` value is not one a client may send.
    #[error("unknown message type `{0}`")]
    UnknownType(String),
}

/// Loose inbound shape; extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    msg_type: Option<serde_json::Value>,
    #[serde(default)]
    channel: Option<serde_json::Value>,
}

impl ClientCommand {
    /// Decodes a text frame into a command.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] when the frame is not a JSON object, lacks
    /// `type` (or `channel` for join/leave), or names an unknown type.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let Some(serde_json::Value::String(msg_type)) = raw.msg_type else {
            return Err(FrameError::MissingField("type"));
        };
        let channel = match raw.channel {
            Some(serde_json::Value::String(channel)) => Some(channel),
            _ => None,
        };

        match msg_type.as_str() {
            "join" => channel
                .map(Self::Join)
                .ok_or(FrameError::MissingField("channel")),
            "leave" => channel
                .map(Self::Leave)
                .ok_or(FrameError::MissingField("channel")),
            "ping" => Ok(Self::Ping),
            "pong" => Ok(Self::Pong),
            _ => Err(FrameError::UnknownType(msg_type)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{BoardId, SanitizedTag};

    fn to_value(msg: &ServerMessage) -> serde_json::Value {
        let Ok(json) = msg.to_json() else {
            panic!("serialization failed");
        };
        serde_json::from_str(&json).unwrap_or_default()
    }

    #[test]
    fn join_notification_shape() {
        let msg = ServerMessage::join(Channel::Board(BoardId::new(5)), UserId::new(7));
        assert_eq!(
            to_value(&msg),
            serde_json::json!({"type": "join", "channel": "board_5", "userId": 7})
        );
    }

    #[test]
    fn register_has_no_channel() {
        let msg = ServerMessage::register(UserId::new(3));
        assert_eq!(
            to_value(&msg),
            serde_json::json!({"type": "register", "userId": 3})
        );
    }

    #[test]
    fn ping_and_pong_are_bare() {
        assert_eq!(to_value(&ServerMessage::ping()), serde_json::json!({"type": "ping"}));
        assert_eq!(to_value(&ServerMessage::pong()), serde_json::json!({"type": "pong"}));
    }

    #[test]
    fn mutation_flattens_entity() {
        let tag = SanitizedTag {
            id: 2,
            board_id: 5,
            name: "urgent".to_string(),
            color: "#ff0000".to_string(),
        };
        let msg = ServerMessage::mutation(
            Channel::Board(BoardId::new(5)),
            MutationKind::Deleted,
            Entity::Tag(tag),
        );
        assert_eq!(
            to_value(&msg),
            serde_json::json!({
                "type": "deleted",
                "channel": "board_5",
                "tag": {"id": 2, "boardId": 5, "name": "urgent", "color": "#ff0000"}
            })
        );
    }

    #[test]
    fn parses_known_commands() {
        let cases = [
            (r#"{"type":"join","channel":"board_5"}"#, ClientCommand::Join("board_5".into())),
            (r#"{"type":"leave","channel":"board_5"}"#, ClientCommand::Leave("board_5".into())),
            (r#"{"type":"ping"}"#, ClientCommand::Ping),
            (r#"{"type":"pong","extra":true}"#, ClientCommand::Pong),
        ];
        for (text, expected) in cases {
            let Ok(cmd) = ClientCommand::parse(text) else {
                panic!("{text} should parse");
            };
            assert_eq!(cmd, expected);
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            ClientCommand::parse("not json"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            ClientCommand::parse("42"),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"channel":"board_5"}"#),
            Err(FrameError::MissingField("type"))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"type":5}"#),
            Err(FrameError::MissingField("type"))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"type":"join"}"#),
            Err(FrameError::MissingField("channel"))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"type":"leave","channel":5}"#),
            Err(FrameError::MissingField("channel"))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"type":"register","channel":"board_5"}"#),
            Err(FrameError::UnknownType(t)) if t == "register"
        ));
    }
}
