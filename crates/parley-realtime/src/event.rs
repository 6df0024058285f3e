//! Real-time event frames and the normalized feed shape.

use crate::topic::Topic;
use parley_types::{ChatMessageView, MessageStatus, MessageView, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A real-time event delivered to every client subscribed to its topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    /// Frame type; always `"event"`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Topic this event was published on.
    pub channel: Topic,

    /// What happened.
    pub event: EventKind,

    /// Event payload data.
    pub data: serde_json::Value,

    /// Unix milliseconds when the event was published.
    pub timestamp: u64,

    /// Unique event ID.
    pub event_id: String,
}

impl RealtimeEvent {
    /// Create a new real-time event.
    pub fn new(channel: Topic, event: EventKind, data: serde_json::Value) -> Self {
        Self {
            event_type: "event".to_string(),
            channel,
            event,
            data,
            timestamp: parley_types::now_millis(),
            event_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Event names carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A message was persisted.
    NewMessage,
    /// A conversation was marked read by staff.
    MessagesRead,
    /// Typing indicator relayed between clients.
    Typing,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::NewMessage => "new-message",
            EventKind::MessagesRead => "messages-read",
            EventKind::Typing => "typing",
        };
        f.write_str(s)
    }
}

/// A message as the client feed sees it, independent of surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    pub id: String,
    /// Conversation id or chat room id.
    pub thread_id: String,
    /// Customer owning the conversation, when known.
    pub owner_id: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: Role,
    pub content: String,
    pub created_at: u64,
    pub read: bool,
}

impl From<&MessageView> for FeedMessage {
    fn from(view: &MessageView) -> Self {
        let sender_name = view
            .sender
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| view.sender.email.clone());
        Self {
            id: view.message.id.clone(),
            thread_id: view.message.conversation_id.clone(),
            owner_id: view.conversation.customer_id.clone(),
            sender_id: view.sender.id.clone(),
            sender_name,
            sender_role: view.sender.role,
            content: view.message.content.clone(),
            created_at: view.message.created_at,
            read: view.message.status == MessageStatus::Read,
        }
    }
}

impl From<&ChatMessageView> for FeedMessage {
    fn from(view: &ChatMessageView) -> Self {
        Self {
            id: view.message.id.clone(),
            thread_id: view.message.room_id.clone(),
            owner_id: None,
            sender_id: view.sender.id.clone(),
            sender_name: view.sender.name.clone().unwrap_or_else(|| view.sender.email.clone()),
            sender_role: view.sender.role,
            content: view.message.content.clone(),
            created_at: view.message.created_at,
            read: false,
        }
    }
}
