//! Persisted message model

use serde::{Deserialize, Serialize};

use crate::types::{MessageId, Timestamp, UserId};

/// Message content: inline text or a reference to an uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Text { text: String },
    Image { url: String, filename: String },
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Payload::Image {
            url: url.into(),
            filename: filename.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text { .. } => "text",
            Payload::Image { .. } => "image",
        }
    }
}

/// A message between two identities
///
/// `delivered` and `read_at` only ever move forward: delivered never returns to
/// false and a set `read_at` is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub from: UserId,
    pub to: UserId,
    pub payload: Payload,
    pub timestamp: Timestamp,
    pub delivered: bool,
    #[serde(default)]
    pub read_at: Option<Timestamp>,
}

impl Message {
    /// Whether `identity` is the sender or the recipient
    pub fn involves(&self, identity: &UserId) -> bool {
        &self.from == identity || &self.to == identity
    }

    /// Whether the message belongs to the conversation between `a` and `b`
    pub fn between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }

    pub fn status(&self) -> MessageStatus {
        MessageStatus::from(self)
    }
}

/// Status snapshot broadcast after every status mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatus {
    pub message_id: MessageId,
    pub from: UserId,
    pub to: UserId,
    pub delivered: bool,
    pub read_at: Option<Timestamp>,
}

impl From<&Message> for MessageStatus {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            from: message.from.clone(),
            to: message.to.clone(),
            delivered: message.delivered,
            read_at: message.read_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            id: MessageId::new(7),
            from: UserId::new("alice"),
            to: UserId::new("bob"),
            payload: Payload::image("http://localhost:3000/uploads/1-cat.png", "1-cat.png"),
            timestamp: Timestamp::new(1_000),
            delivered: false,
            read_at: None,
        }
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["payload"]["kind"], "image");
        assert_eq!(json["payload"]["kind"], sample().payload.kind());
        assert_eq!(Payload::text("hi").kind(), "text");
        assert_eq!(json["payload"]["filename"], "1-cat.png");
        assert_eq!(json["readAt"], serde_json::Value::Null);
    }

    #[test]
    fn test_conversation_membership() {
        let message = sample();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let carol = UserId::new("carol");

        assert!(message.between(&bob, &alice));
        assert!(!message.between(&alice, &carol));
        assert!(message.involves(&bob));
        assert!(!message.involves(&carol));
    }
}
