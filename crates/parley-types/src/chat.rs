//! Direct chat rooms, the second messaging surface.

use serde::{Deserialize, Serialize};

use crate::CustomerSummary;

/// Unique identifier for a chat room.
pub type ChatRoomId = String;

/// A room owned by one user or guest identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: ChatRoomId,
    /// Customer id or guest token that owns the room.
    pub owner_id: String,
    pub created_at: u64,
}

/// A message posted into a chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub room_id: ChatRoomId,
    pub sender_id: String,
    pub content: String,
    pub created_at: u64,
}

/// A chat message joined with its sender projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender: CustomerSummary,
}
