//! Common types used throughout Parley.
//!
//! This crate holds the records persisted by the support gateway
//! (customers, conversations, messages, chat rooms) and the read models
//! handed to HTTP callers and realtime subscribers.

mod chat;
mod conversation;
mod customer;
mod message;
mod role;
mod view;

pub use chat::{ChatMessage, ChatMessageView, ChatRoom, ChatRoomId};
pub use conversation::{Conversation, ConversationId};
pub use customer::{Customer, CustomerId, CustomerSummary};
pub use message::{Message, MessageId, MessageKind, MessageStatus};
pub use role::Role;
pub use view::{ConversationRef, ConversationStats, ConversationSummary, MessagePage, MessageView};

use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of messages returned per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Milliseconds in one day.
const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Unix milliseconds of the most recent UTC midnight at or before `millis`.
pub fn start_of_day(millis: u64) -> u64 {
    millis - millis % DAY_MILLIS
}
