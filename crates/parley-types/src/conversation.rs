//! Support conversations.

use serde::{Deserialize, Serialize};

use crate::CustomerId;

/// Unique identifier for a conversation.
pub type ConversationId = String;

/// One customer's support thread.
///
/// Conversations are never deleted; they only accumulate messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Optional title ("Support - <name>").
    pub title: Option<String>,
    /// Owning customer, if customer-originated.
    pub customer_id: Option<CustomerId>,
    /// Unix milliseconds when created.
    pub created_at: u64,
    /// Unix milliseconds of the last message.
    pub updated_at: u64,
}

impl Conversation {
    /// Returns true if `customer_id` owns this conversation.
    pub fn is_owned_by(&self, customer_id: &str) -> bool {
        self.customer_id.as_deref() == Some(customer_id)
    }
}
