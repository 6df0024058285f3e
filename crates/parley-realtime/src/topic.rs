//! Topic names for the two messaging surfaces.

use crate::error::RealtimeError;
use serde::{Deserialize, Serialize};
use std::fmt;

const ADMIN_BROADCAST: &str = "admin-broadcast";
const CUSTOMER_SUPPORT: &str = "customer-support";
const CONVERSATION_PREFIX: &str = "conversation";
const CHAT_ROOM_PREFIX: &str = "chat-room";

/// A pub/sub topic.
///
/// Formats:
/// - `admin-broadcast` - every customer-conversation message, for staff
/// - `customer-support` - the shared support inbox
/// - `conversation:{id}` - one support conversation
/// - `chat-room:{id}` - one direct chat room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    AdminBroadcast,
    CustomerSupport,
    Conversation(String),
    ChatRoom(String),
}

impl Topic {
    /// Parse a topic string.
    pub fn parse(s: &str) -> Result<Self, RealtimeError> {
        match s {
            ADMIN_BROADCAST => return Ok(Topic::AdminBroadcast),
            CUSTOMER_SUPPORT => return Ok(Topic::CustomerSupport),
            _ => {}
        }

        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| RealtimeError::InvalidTopic(format!("unknown topic: {}", s)))?;

        if id.is_empty() || id.contains('*') || id.contains(':') {
            return Err(RealtimeError::InvalidTopic(format!(
                "topic identifier must be a concrete id: {}",
                s
            )));
        }

        match prefix {
            CONVERSATION_PREFIX => Ok(Topic::Conversation(id.to_string())),
            CHAT_ROOM_PREFIX => Ok(Topic::ChatRoom(id.to_string())),
            _ => Err(RealtimeError::InvalidTopic(format!(
                "unknown topic prefix: {}",
                prefix
            ))),
        }
    }

    /// Wildcard pattern covering every conversation topic.
    pub fn all_conversations() -> String {
        format!("{}:*", CONVERSATION_PREFIX)
    }

    /// Wildcard pattern covering every chat-room topic.
    pub fn all_chat_rooms() -> String {
        format!("{}:*", CHAT_ROOM_PREFIX)
    }

    /// Id of the conversation or room this topic is scoped to.
    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Topic::Conversation(id) | Topic::ChatRoom(id) => Some(id),
            Topic::AdminBroadcast | Topic::CustomerSupport => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::AdminBroadcast => f.write_str(ADMIN_BROADCAST),
            Topic::CustomerSupport => f.write_str(CUSTOMER_SUPPORT),
            Topic::Conversation(id) => write!(f, "{}:{}", CONVERSATION_PREFIX, id),
            Topic::ChatRoom(id) => write!(f, "{}:{}", CHAT_ROOM_PREFIX, id),
        }
    }
}

impl TryFrom<String> for Topic {
    type Error = RealtimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::parse(&value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_topics() {
        assert_eq!(Topic::parse("admin-broadcast").unwrap(), Topic::AdminBroadcast);
        assert_eq!(Topic::parse("customer-support").unwrap(), Topic::CustomerSupport);
    }

    #[test]
    fn test_parse_scoped_topics() {
        assert_eq!(
            Topic::parse("conversation:abc").unwrap(),
            Topic::Conversation("abc".into())
        );
        assert_eq!(
            Topic::parse("chat-room:r1").unwrap(),
            Topic::ChatRoom("r1".into())
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Topic::parse("invalid").is_err());
        assert!(Topic::parse("conversation:").is_err());
        assert!(Topic::parse("conversation:*").is_err());
        assert!(Topic::parse("repo:alice/x").is_err());
        assert!(Topic::parse("chat-room:a:b").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["admin-broadcast", "customer-support", "conversation:c1", "chat-room:r1"] {
            assert_eq!(Topic::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Topic::Conversation("c1".into())).unwrap();
        assert_eq!(json, "\"conversation:c1\"");
        let parsed: Topic = serde_json::from_str("\"chat-room:r9\"").unwrap();
        assert_eq!(parsed.scope_id(), Some("r9"));
        assert!(serde_json::from_str::<Topic>("\"nope\"").is_err());
    }
}
