//! Conversation messages and their delivery status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ConversationId, CustomerId};

/// Unique identifier for a message.
pub type MessageId = String;

/// Content type of a message. Only `Text` is exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// Delivery status. Transitions only `Sent -> Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    #[default]
    Sent,
    Read,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Sent => write!(f, "SENT"),
            MessageStatus::Read => write!(f, "READ"),
        }
    }
}

/// A message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Non-empty text content.
    pub content: String,
    /// Content type.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Delivery status.
    pub status: MessageStatus,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: CustomerId,
    /// Free-form metadata bag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Unix milliseconds when created.
    pub created_at: u64,
    /// Unix milliseconds of the last status change.
    pub updated_at: u64,
}

impl Message {
    /// Moves the message to `Read`. Returns false if it already was.
    pub fn mark_read(&mut self, now: u64) -> bool {
        if self.status == MessageStatus::Read {
            return false;
        }
        self.status = MessageStatus::Read;
        self.updated_at = now;
        true
    }

    /// Returns true unless the message has been read.
    pub fn is_unread(&self) -> bool {
        self.status != MessageStatus::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message {
            id: "m1".into(),
            content: "Hello".into(),
            kind: MessageKind::Text,
            status: MessageStatus::Sent,
            conversation_id: "conv".into(),
            sender_id: "c1".into(),
            metadata: None,
            created_at: 10,
            updated_at: 10,
        }
    }

    #[test]
    fn test_mark_read_once() {
        let mut msg = message();
        assert!(msg.is_unread());
        assert!(msg.mark_read(20));
        assert!(!msg.is_unread());
        assert_eq!(msg.updated_at, 20);

        assert!(!msg.mark_read(30));
        assert_eq!(msg.updated_at, 20);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["type"], "TEXT");
        assert_eq!(json["status"], "SENT");
        assert_eq!(json["conversationId"], "conv");
        assert!(json.get("metadata").is_none());
    }
}
