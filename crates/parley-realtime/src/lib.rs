//! # Parley Real-time
//!
//! Topic routing, capability grants and realtime fan-out for Parley
//! support messaging.
//!
//! ## Topics
//!
//! - `admin-broadcast` - every customer-conversation message, for staff
//! - `customer-support` - the shared support inbox
//! - `conversation:{id}` - one support conversation
//! - `chat-room:{id}` - one direct chat room
//!
//! ## Example
//!
//! ```rust
//! use parley_realtime::{ClientCommand, EventHub, EventKind, GrantSubject, Publisher, Topic};
//!
//! let hub = EventHub::new();
//!
//! // Grants are issued per identity and presented on connect.
//! let grant = hub.issue_grant("admin-1", GrantSubject::Staff.capability());
//! let (client, mut rx) = hub.connect(&grant.token).unwrap();
//!
//! hub.handle_command(
//!     &client,
//!     ClientCommand::Subscribe {
//!         channel: "admin-broadcast".to_string(),
//!     },
//! )
//! .unwrap();
//!
//! hub.publish(
//!     &Topic::AdminBroadcast,
//!     EventKind::NewMessage,
//!     serde_json::json!({"id": "m1"}),
//! )
//! .unwrap();
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! ## WebSocket Protocol
//!
//! ### Client -> Server Messages
//!
//! ```json
//! {"type": "subscribe", "channel": "conversation:c1"}
//! {"type": "unsubscribe", "channel": "conversation:c1"}
//! {"type": "publish", "channel": "conversation:c1", "event": "typing", "data": {}}
//! {"type": "ping"}
//! ```
//!
//! ### Server -> Client Messages
//!
//! ```json
//! {"type": "subscribed", "channel": "conversation:c1"}
//! {"type": "event", "channel": "conversation:c1", "event": "new-message", ...}
//! {"type": "pong"}
//! ```

pub mod adapter;
pub mod client;
pub mod error;
pub mod event;
pub mod grant;
pub mod guest;
pub mod hub;
pub mod policy;
pub mod subscription;
pub mod topic;
pub mod tracker;
pub mod transport;

// Re-export main types
pub use adapter::{ConnectionState, FeedSource, RealtimeAdapter};
pub use client::{Client, ClientId, ClientReceiver};
pub use error::RealtimeError;
pub use event::{EventKind, FeedMessage, RealtimeEvent};
pub use grant::{
    Capability, CapabilityGrant, GrantRegistry, GrantSubject, Operation, DEFAULT_GRANT_TTL,
};
pub use guest::{is_guest_id, GuestIdentity, GUEST_PREFIX};
pub use hub::{ClientCommand, EventHub, HubStats, Publisher, ServerMessage, DEFAULT_MAX_CONNECTIONS};
pub use policy::{ChatRoomPolicy, RoutingPolicy, Surface, SupportPolicy, Viewer};
pub use subscription::{ClientSubscriptions, MAX_SUBSCRIPTIONS_PER_CLIENT};
pub use topic::Topic;
pub use tracker::{ConversationTracker, ThreadPreview, TrackerOutcome};
pub use transport::{Connection, HubTransport, Transport};

/// Result type for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api() {
        let hub = EventHub::new();
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.stats().active_grants, 0);
    }
}
