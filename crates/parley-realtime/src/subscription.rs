//! Per-client subscription sets.

use crate::error::RealtimeError;
use crate::topic::Topic;
use std::collections::BTreeSet;

/// Maximum subscriptions per client.
pub const MAX_SUBSCRIPTIONS_PER_CLIENT: usize = 100;

/// Manages subscriptions for a single client.
#[derive(Debug, Default)]
pub struct ClientSubscriptions {
    topics: BTreeSet<Topic>,
}

impl ClientSubscriptions {
    /// Create an empty subscription set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic. Returns false if already subscribed.
    pub fn subscribe(&mut self, topic: Topic) -> Result<bool, RealtimeError> {
        if self.topics.contains(&topic) {
            return Ok(false);
        }
        if self.topics.len() >= MAX_SUBSCRIPTIONS_PER_CLIENT {
            return Err(RealtimeError::SubscriptionLimit(
                MAX_SUBSCRIPTIONS_PER_CLIENT,
            ));
        }
        Ok(self.topics.insert(topic))
    }

    /// Unsubscribe from a topic.
    pub fn unsubscribe(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    /// Check if subscribed to a topic.
    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }

    /// All subscribed topics, in order.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    /// Get subscription count.
    pub fn count(&self) -> usize {
        self.topics.len()
    }

    /// Clear all subscriptions.
    pub fn clear(&mut self) {
        self.topics.clear();
    }
}
