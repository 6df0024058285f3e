//! Client connection management.

use crate::error::RealtimeError;
use crate::subscription::ClientSubscriptions;
use crate::topic::Topic;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unique identifier for a connected client.
pub type ClientId = String;

/// A connected realtime client.
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier.
    pub id: ClientId,
    /// Channel for sending frames to this client.
    sender: mpsc::UnboundedSender<String>,
    /// Client's subscriptions.
    subscriptions: RwLock<ClientSubscriptions>,
    /// Connection metadata.
    pub metadata: ClientMetadata,
}

impl Client {
    /// Create a new client bound to a grant token.
    pub fn new(
        id: ClientId,
        sender: mpsc::UnboundedSender<String>,
        metadata: ClientMetadata,
    ) -> Self {
        Self {
            id,
            sender,
            subscriptions: RwLock::new(ClientSubscriptions::new()),
            metadata,
        }
    }

    /// Send a frame to this client.
    pub fn send(&self, message: String) -> Result<(), RealtimeError> {
        self.sender
            .send(message)
            .map_err(|_| RealtimeError::ChannelClosed)
    }

    /// Subscribe to a topic.
    pub fn subscribe(&self, topic: Topic) -> Result<bool, RealtimeError> {
        self.subscriptions.write().subscribe(topic)
    }

    /// Unsubscribe from a topic.
    pub fn unsubscribe(&self, topic: &Topic) -> bool {
        self.subscriptions.write().unsubscribe(topic)
    }

    /// Check if subscribed to a topic.
    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.subscriptions.read().is_subscribed(topic)
    }

    /// Snapshot of subscribed topics.
    pub fn topics(&self) -> Vec<Topic> {
        self.subscriptions.read().topics().cloned().collect()
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().count()
    }

    /// Clear all subscriptions.
    pub fn clear_subscriptions(&self) {
        self.subscriptions.write().clear();
    }
}

/// Metadata about a client connection.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    /// When the client connected (unix milliseconds).
    pub connected_at: u64,
    /// Identity the grant was issued to.
    pub user_id: String,
    /// Token of the grant the client connected with.
    pub grant_token: String,
}

impl ClientMetadata {
    /// Metadata stamped with the current time.
    pub fn now(user_id: &str, grant_token: &str) -> Self {
        Self {
            connected_at: parley_types::now_millis(),
            user_id: user_id.to_string(),
            grant_token: grant_token.to_string(),
        }
    }
}

/// Handle for receiving frames from the hub.
pub type ClientReceiver = mpsc::UnboundedReceiver<String>;

/// Create a new client with its frame receiver.
pub fn create_client(id: ClientId, metadata: ClientMetadata) -> (Arc<Client>, ClientReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let client = Arc::new(Client::new(id, sender, metadata));
    (client, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (Arc<Client>, ClientReceiver) {
        create_client("conn-1".to_string(), ClientMetadata::now("cust-1", "tok"))
    }

    #[test]
    fn test_client_creation() {
        let (client, _rx) = client();
        assert_eq!(client.id, "conn-1");
        assert_eq!(client.metadata.user_id, "cust-1");
        assert_eq!(client.subscription_count(), 0);
    }

    #[test]
    fn test_client_subscriptions() {
        let (client, _rx) = client();
        let topic = Topic::Conversation("c1".into());

        assert!(client.subscribe(topic.clone()).unwrap());
        assert!(client.is_subscribed(&topic));
        assert_eq!(client.topics(), vec![topic.clone()]);

        assert!(client.unsubscribe(&topic));
        assert!(!client.is_subscribed(&topic));

        client.subscribe(Topic::AdminBroadcast).unwrap();
        client.clear_subscriptions();
        assert_eq!(client.subscription_count(), 0);
    }

    #[test]
    fn test_client_send() {
        let (client, mut rx) = client();
        client.send("frame".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "frame");

        drop(rx);
        assert!(matches!(
            client.send("late".to_string()),
            Err(RealtimeError::ChannelClosed)
        ));
    }
}
