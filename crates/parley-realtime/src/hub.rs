//! Event hub for managing realtime connections and topic fan-out.

use crate::client::{create_client, Client, ClientId, ClientMetadata, ClientReceiver};
use crate::error::RealtimeError;
use crate::event::{EventKind, RealtimeEvent};
use crate::grant::{Capability, CapabilityGrant, GrantRegistry, Operation, DEFAULT_GRANT_TTL};
use crate::topic::Topic;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the broadcast channel.
const BROADCAST_CAPACITY: usize = 1024;

/// Default maximum number of concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// Something that can put an event on a topic.
///
/// The messaging façade publishes through this seam so persistence can be
/// tested against a recording or failing publisher.
pub trait Publisher: Send + Sync {
    /// Publish `data` as `event` on `topic`. Returns the number of
    /// connected recipients.
    fn publish(
        &self,
        topic: &Topic,
        event: EventKind,
        data: serde_json::Value,
    ) -> Result<usize, RealtimeError>;
}

/// Event hub manages realtime connections, their grants and fan-out.
#[derive(Debug)]
pub struct EventHub {
    /// Connected clients indexed by ID.
    clients: RwLock<HashMap<ClientId, Arc<Client>>>,
    /// Outstanding capability grants.
    grants: GrantRegistry,
    /// Broadcast channel for events.
    event_tx: broadcast::Sender<RealtimeEvent>,
    /// Maximum concurrent connections.
    max_connections: usize,
    /// Statistics.
    stats: RwLock<HubStats>,
}

impl EventHub {
    /// Create a new event hub with default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_CONNECTIONS, DEFAULT_GRANT_TTL)
    }

    /// Create an event hub with the given connection cap and grant lifetime.
    pub fn with_limits(max_connections: usize, grant_ttl: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            clients: RwLock::new(HashMap::new()),
            grants: GrantRegistry::new(grant_ttl),
            event_tx,
            max_connections,
            stats: RwLock::new(HubStats::default()),
        }
    }

    /// Issue a capability grant for `user_id`.
    pub fn issue_grant(&self, user_id: &str, capability: Capability) -> CapabilityGrant {
        let grant = self.grants.issue(user_id, capability);
        self.stats.write().grants_issued += 1;
        grant
    }

    /// Add a topic to every live grant of `user_id`.
    pub fn extend_grants(&self, user_id: &str, topic: &Topic, operations: Vec<Operation>) -> usize {
        self.grants.extend_for_client(user_id, topic.to_string(), operations)
    }

    /// Check a token and the connection limit without registering a client.
    pub fn verify(&self, token: &str) -> Result<CapabilityGrant, RealtimeError> {
        let grant = self.grants.lookup(token)?;
        if self.connection_count() >= self.max_connections {
            return Err(RealtimeError::ConnectionLimit(self.max_connections));
        }
        Ok(grant)
    }

    /// Connect a client presenting a grant token.
    pub fn connect(&self, token: &str) -> Result<(Arc<Client>, ClientReceiver), RealtimeError> {
        let grant = self.verify(token)?;

        let client_id = uuid::Uuid::new_v4().to_string();
        let (client, receiver) = create_client(
            client_id.clone(),
            ClientMetadata::now(&grant.client_id, &grant.token),
        );

        self.clients.write().insert(client_id.clone(), client.clone());
        self.stats.write().total_connections += 1;

        info!(client_id = %client_id, user_id = %grant.client_id, "Client connected");

        Ok((client, receiver))
    }

    /// Disconnect a client.
    pub fn disconnect(&self, client_id: &str) {
        if let Some(client) = self.clients.write().remove(client_id) {
            client.clear_subscriptions();
            info!(client_id = %client_id, "Client disconnected");
        }
    }

    /// Get a client by ID.
    pub fn get_client(&self, client_id: &str) -> Option<Arc<Client>> {
        self.clients.read().get(client_id).cloned()
    }

    fn authorize(
        &self,
        client: &Client,
        topic: &Topic,
        operation: Operation,
    ) -> Result<(), RealtimeError> {
        let grant = self.grants.lookup(&client.metadata.grant_token)?;
        if grant.allows(topic, operation) {
            Ok(())
        } else {
            warn!(
                client_id = %client.id,
                user_id = %client.metadata.user_id,
                topic = %topic,
                ?operation,
                "Operation outside grant"
            );
            Err(RealtimeError::PermissionDenied(format!(
                "{:?} not allowed on {}",
                operation, topic
            )))
        }
    }

    /// Handle a client command.
    pub fn handle_command(
        &self,
        client: &Arc<Client>,
        command: ClientCommand,
    ) -> Result<ServerMessage, RealtimeError> {
        match command {
            ClientCommand::Subscribe { channel } => {
                let topic = Topic::parse(&channel)?;
                self.authorize(client, &topic, Operation::Subscribe)?;

                if client.subscribe(topic)? {
                    debug!(client_id = %client.id, channel = %channel, "Client subscribed");
                    self.stats.write().total_subscriptions += 1;
                }

                Ok(ServerMessage::Subscribed { channel })
            }
            ClientCommand::Unsubscribe { channel } => {
                let topic = Topic::parse(&channel)?;

                if client.unsubscribe(&topic) {
                    debug!(client_id = %client.id, channel = %channel, "Client unsubscribed");
                }

                Ok(ServerMessage::Unsubscribed { channel })
            }
            ClientCommand::Publish {
                channel,
                event,
                data,
            } => {
                let topic = Topic::parse(&channel)?;
                self.authorize(client, &topic, Operation::Publish)?;
                let recipients = self.emit(RealtimeEvent::new(topic, event, data))?;
                Ok(ServerMessage::Published {
                    channel,
                    recipients,
                })
            }
            ClientCommand::Ping => Ok(ServerMessage::Pong),
        }
    }

    /// Emit an event to all subscribed clients.
    pub fn emit(&self, event: RealtimeEvent) -> Result<usize, RealtimeError> {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                self.stats.write().publish_failures += 1;
                return Err(e.into());
            }
        };

        let mut recipient_count = 0;
        let mut closed = Vec::new();
        let clients = self.clients.read();
        for client in clients.values() {
            if !client.is_subscribed(&event.channel) {
                continue;
            }
            match client.send(json.clone()) {
                Ok(()) => recipient_count += 1,
                Err(_) => closed.push(client.id.clone()),
            }
        }
        drop(clients);

        // A failed send means the receiving half is gone.
        for client_id in closed {
            warn!(client_id = %client_id, "Pruning client with closed channel");
            self.disconnect(&client_id);
        }

        debug!(
            channel = %event.channel,
            event = %event.event,
            recipients = recipient_count,
            "Event broadcast"
        );

        // Also send to broadcast channel for any listeners
        let _ = self.event_tx.send(event);
        self.stats.write().total_events += 1;

        Ok(recipient_count)
    }

    /// Subscribe to the broadcast channel for events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.event_tx.subscribe()
    }

    /// Get current connection count.
    pub fn connection_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Get hub statistics.
    pub fn stats(&self) -> HubStats {
        let mut stats = self.stats.read().clone();
        stats.current_connections = self.connection_count();
        stats.active_grants = self.grants.len();
        stats
    }

    /// Count a publish attempt that failed outside the hub.
    pub fn record_publish_failure(&self) {
        self.stats.write().publish_failures += 1;
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for EventHub {
    fn publish(
        &self,
        topic: &Topic,
        event: EventKind,
        data: serde_json::Value,
    ) -> Result<usize, RealtimeError> {
        self.emit(RealtimeEvent::new(topic.clone(), event, data))
    }
}

/// Commands that clients can send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe to a topic.
    Subscribe { channel: String },
    /// Unsubscribe from a topic.
    Unsubscribe { channel: String },
    /// Publish an event on a topic.
    Publish {
        channel: String,
        event: EventKind,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Ping for keepalive.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed.
    Subscribed { channel: String },
    /// Unsubscription confirmed.
    Unsubscribed { channel: String },
    /// Publish accepted.
    Published { channel: String, recipients: usize },
    /// Pong response to ping.
    Pong,
    /// Error message.
    Error { message: String },
}

/// Hub statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Current number of connections.
    pub current_connections: usize,
    /// Total connections since start.
    pub total_connections: u64,
    /// Total subscriptions since start.
    pub total_subscriptions: u64,
    /// Total events broadcast since start.
    pub total_events: u64,
    /// Publish attempts that failed.
    pub publish_failures: u64,
    /// Grants issued since start.
    pub grants_issued: u64,
    /// Grants currently held.
    pub active_grants: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::GrantSubject;

    fn staff_token(hub: &EventHub) -> String {
        hub.issue_grant("admin-1", GrantSubject::Staff.capability()).token
    }

    fn customer_token(hub: &EventHub, conversations: &[&str]) -> String {
        let subject = GrantSubject::Customer {
            conversations: conversations.iter().map(|s| s.to_string()).collect(),
            room: None,
        };
        hub.issue_grant("cust-1", subject.capability()).token
    }

    fn subscribe(
        hub: &EventHub,
        client: &Arc<Client>,
        channel: &str,
    ) -> Result<ServerMessage, RealtimeError> {
        hub.handle_command(
            client,
            ClientCommand::Subscribe {
                channel: channel.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_hub_connect_requires_grant() {
        let hub = EventHub::new();
        assert!(matches!(hub.connect("nope"), Err(RealtimeError::InvalidToken)));

        let (client, _rx) = hub.connect(&staff_token(&hub)).unwrap();
        assert!(!client.id.is_empty());
        assert_eq!(client.metadata.user_id, "admin-1");
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_hub_connection_limit() {
        let hub = EventHub::with_limits(1, DEFAULT_GRANT_TTL);
        let token = staff_token(&hub);
        let _first = hub.connect(&token).unwrap();
        assert!(matches!(hub.connect(&token), Err(RealtimeError::ConnectionLimit(1))));
    }

    #[tokio::test]
    async fn test_hub_disconnect_closes_receiver() {
        let hub = EventHub::new();
        let (client, mut rx) = hub.connect(&staff_token(&hub)).unwrap();
        let client_id = client.id.clone();
        drop(client);

        hub.disconnect(&client_id);
        assert_eq!(hub.connection_count(), 0);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_verify_registers_nothing() {
        let hub = EventHub::with_limits(1, DEFAULT_GRANT_TTL);
        assert!(matches!(hub.verify("nope"), Err(RealtimeError::InvalidToken)));

        let token = staff_token(&hub);
        assert_eq!(hub.verify(&token).unwrap().client_id, "admin-1");
        assert_eq!(hub.connection_count(), 0);

        let _first = hub.connect(&token).unwrap();
        assert!(matches!(hub.verify(&token), Err(RealtimeError::ConnectionLimit(1))));
    }

    #[tokio::test]
    async fn test_emit_prunes_clients_with_closed_channel() {
        let hub = EventHub::new();
        let token = staff_token(&hub);
        let (gone, gone_rx) = hub.connect(&token).unwrap();
        let (live, mut live_rx) = hub.connect(&token).unwrap();
        subscribe(&hub, &gone, "admin-broadcast").unwrap();
        subscribe(&hub, &live, "admin-broadcast").unwrap();
        drop(gone_rx);

        let recipients = hub
            .publish(&Topic::AdminBroadcast, EventKind::NewMessage, serde_json::json!({}))
            .unwrap();
        assert_eq!(recipients, 1);
        assert!(live_rx.try_recv().is_ok());
        assert_eq!(hub.connection_count(), 1);
        assert!(hub.get_client(&gone.id).is_none());
    }

    #[tokio::test]
    async fn test_subscribe_checked_against_grant() {
        let hub = EventHub::new();
        let (client, _rx) = hub.connect(&customer_token(&hub, &["c1"])).unwrap();

        assert!(matches!(
            subscribe(&hub, &client, "conversation:c1").unwrap(),
            ServerMessage::Subscribed { .. }
        ));
        assert!(matches!(
            subscribe(&hub, &client, "conversation:c2"),
            Err(RealtimeError::PermissionDenied(_))
        ));
        assert!(matches!(
            subscribe(&hub, &client, "admin-broadcast"),
            Err(RealtimeError::PermissionDenied(_))
        ));
        assert_eq!(client.subscription_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_checked_against_grant() {
        let hub = EventHub::new();
        let (client, _rx) = hub.connect(&customer_token(&hub, &["c1"])).unwrap();

        let denied = hub.handle_command(
            &client,
            ClientCommand::Publish {
                channel: "customer-support".into(),
                event: EventKind::Typing,
                data: serde_json::Value::Null,
            },
        );
        assert!(matches!(denied, Err(RealtimeError::PermissionDenied(_))));

        let ok = hub
            .handle_command(
                &client,
                ClientCommand::Publish {
                    channel: "conversation:c1".into(),
                    event: EventKind::Typing,
                    data: serde_json::json!({"typing": true}),
                },
            )
            .unwrap();
        assert_eq!(
            ok,
            ServerMessage::Published {
                channel: "conversation:c1".into(),
                recipients: 0
            }
        );
    }

    #[tokio::test]
    async fn test_extended_grant_applies_to_live_connection() {
        let hub = EventHub::new();
        let (client, _rx) = hub.connect(&customer_token(&hub, &[])).unwrap();
        assert!(subscribe(&hub, &client, "conversation:new").is_err());

        let topic = Topic::Conversation("new".into());
        hub.extend_grants("cust-1", &topic, vec![Operation::Subscribe, Operation::Publish]);
        assert!(subscribe(&hub, &client, "conversation:new").is_ok());
    }

    #[tokio::test]
    async fn test_hub_ping_pong() {
        let hub = EventHub::new();
        let (client, _rx) = hub.connect(&staff_token(&hub)).unwrap();
        let response = hub.handle_command(&client, ClientCommand::Ping).unwrap();
        assert!(matches!(response, ServerMessage::Pong));
    }

    #[tokio::test]
    async fn test_emit_reaches_only_subscribers() {
        let hub = EventHub::new();
        let token = staff_token(&hub);
        let (client1, mut rx1) = hub.connect(&token).unwrap();
        let (client2, mut rx2) = hub.connect(&token).unwrap();

        subscribe(&hub, &client1, "conversation:c1").unwrap();
        subscribe(&hub, &client2, "conversation:c2").unwrap();

        let recipients = hub
            .publish(
                &Topic::Conversation("c1".into()),
                EventKind::NewMessage,
                serde_json::json!({"id": "m1"}),
            )
            .unwrap();
        assert_eq!(recipients, 1);

        let msg = rx1.try_recv().unwrap();
        assert!(msg.contains("new-message"));
        assert!(msg.contains("conversation:c1"));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_hub_stats() {
        let hub = EventHub::new();
        let (client, _rx) = hub.connect(&staff_token(&hub)).unwrap();
        subscribe(&hub, &client, "admin-broadcast").unwrap();
        hub.publish(&Topic::AdminBroadcast, EventKind::NewMessage, serde_json::json!({}))
            .unwrap();
        hub.record_publish_failure();

        let stats = hub.stats();
        assert_eq!(stats.current_connections, 1);
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.total_subscriptions, 1);
        assert_eq!(stats.total_events, 1);
        assert_eq!(stats.grants_issued, 1);
        assert_eq!(stats.active_grants, 1);
        assert_eq!(stats.publish_failures, 1);
    }

    #[test]
    fn test_client_command_serialization() {
        let parsed: ClientCommand =
            serde_json::from_str(r#"{"type":"subscribe","channel":"conversation:c1"}"#).unwrap();
        assert!(matches!(parsed, ClientCommand::Subscribe { .. }));

        let parsed: ClientCommand = serde_json::from_str(
            r#"{"type":"publish","channel":"chat-room:r1","event":"typing"}"#,
        )
        .unwrap();
        assert!(matches!(
            parsed,
            ClientCommand::Publish {
                event: EventKind::Typing,
                ..
            }
        ));
    }

    #[test]
    fn test_server_message_serialization() {
        let json = serde_json::to_value(ServerMessage::Published {
            channel: "conversation:c1".into(),
            recipients: 2,
        })
        .unwrap();
        assert_eq!(json["type"], "published");
        assert_eq!(json["recipients"], 2);

        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert!(json.contains("pong"));
    }
}
