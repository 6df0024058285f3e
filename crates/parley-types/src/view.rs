//! Read models returned by the gateway and published to subscribers.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, CustomerId, CustomerSummary, Message};

/// Conversation reference embedded in every message view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub id: ConversationId,
    pub title: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub customer: Option<CustomerSummary>,
}

/// A message joined with its sender and conversation summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: CustomerSummary,
    pub conversation: ConversationRef,
}

/// One entry of a conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub customer: Option<CustomerSummary>,
    pub created_at: u64,
    pub updated_at: u64,
    /// Most recent message, if any.
    pub last_message: Option<MessageView>,
    /// Total number of messages.
    pub message_count: usize,
    /// Unread customer messages; present in the staff view only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<usize>,
}

/// A page of messages in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage<T> {
    /// Oldest first.
    pub messages: Vec<T>,
    /// Total messages in the thread.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// `ceil(total / limit)`.
    pub total_pages: usize,
}

impl<T> MessagePage<T> {
    /// Number of pages needed for `total` items at `limit` per page.
    pub fn page_count(total: usize, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }
        total.div_ceil(limit)
    }
}

/// Aggregate counters for the staff dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub unread_conversations: usize,
    pub total_messages: usize,
    pub today_messages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(MessagePage::<()>::page_count(0, 50), 0);
        assert_eq!(MessagePage::<()>::page_count(50, 50), 1);
        assert_eq!(MessagePage::<()>::page_count(120, 50), 3);
        assert_eq!(MessagePage::<()>::page_count(5, 0), 0);
    }
}
