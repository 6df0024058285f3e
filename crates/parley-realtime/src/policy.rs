//! Routing policies for the two messaging surfaces.
//!
//! A policy decides which topics a persisted message is published on,
//! which topics a viewer listens to, and how inbound event payloads become
//! [`FeedMessage`]s. The client adapter and tracker are generic over it, so
//! support conversations and direct chat rooms share one implementation.

use crate::event::{EventKind, FeedMessage, RealtimeEvent};
use crate::topic::Topic;
use parley_types::{ChatMessageView, MessageView, Role};
use serde::{Deserialize, Serialize};

/// Which messaging surface a policy drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Ticket-style support conversations.
    Support,
    /// Direct chat rooms.
    Chat,
}

/// The identity a client session acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Topic routing for one messaging surface.
pub trait RoutingPolicy: Send + Sync {
    /// Surface this policy drives.
    fn surface(&self) -> Surface;

    /// Topics a new message in `scope_id` is published on.
    fn publish_topics(&self, scope_id: &str, sender_role: Role) -> Vec<Topic>;

    /// Topics a viewer listens to with `selected` open.
    fn subscription_topics(&self, viewer: &Viewer, selected: Option<&str>) -> Vec<Topic>;

    /// Whether a message bumps a thread's unread counter.
    fn counts_as_unread(&self, message: &FeedMessage) -> bool;

    /// Turn an inbound event into a feed message, if it carries one.
    fn normalize(&self, event: &RealtimeEvent) -> Option<FeedMessage>;
}

/// Routing for support conversations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportPolicy;

impl RoutingPolicy for SupportPolicy {
    fn surface(&self) -> Surface {
        Surface::Support
    }

    fn publish_topics(&self, conversation_id: &str, sender_role: Role) -> Vec<Topic> {
        let mut topics = vec![Topic::AdminBroadcast];
        if sender_role == Role::Customer {
            topics.push(Topic::CustomerSupport);
        }
        topics.push(Topic::Conversation(conversation_id.to_string()));
        topics
    }

    fn subscription_topics(&self, viewer: &Viewer, selected: Option<&str>) -> Vec<Topic> {
        let selected = selected.map(|id| Topic::Conversation(id.to_string()));
        if viewer.is_staff() {
            std::iter::once(Topic::AdminBroadcast).chain(selected).collect()
        } else {
            vec![selected.unwrap_or(Topic::CustomerSupport)]
        }
    }

    fn counts_as_unread(&self, message: &FeedMessage) -> bool {
        message.sender_role == Role::Customer && !message.read
    }

    fn normalize(&self, event: &RealtimeEvent) -> Option<FeedMessage> {
        if event.event != EventKind::NewMessage {
            return None;
        }
        match event.channel {
            Topic::AdminBroadcast | Topic::CustomerSupport | Topic::Conversation(_) => {}
            Topic::ChatRoom(_) => return None,
        }
        let view: MessageView = serde_json::from_value(event.data.clone()).ok()?;
        Some(FeedMessage::from(&view))
    }
}

/// Routing for direct chat rooms.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatRoomPolicy;

impl RoutingPolicy for ChatRoomPolicy {
    fn surface(&self) -> Surface {
        Surface::Chat
    }

    fn publish_topics(&self, room_id: &str, _sender_role: Role) -> Vec<Topic> {
        vec![Topic::ChatRoom(room_id.to_string())]
    }

    fn subscription_topics(&self, _viewer: &Viewer, selected: Option<&str>) -> Vec<Topic> {
        selected
            .map(|id| Topic::ChatRoom(id.to_string()))
            .into_iter()
            .collect()
    }

    fn counts_as_unread(&self, _message: &FeedMessage) -> bool {
        false
    }

    fn normalize(&self, event: &RealtimeEvent) -> Option<FeedMessage> {
        if event.event != EventKind::NewMessage || !matches!(event.channel, Topic::ChatRoom(_)) {
            return None;
        }
        let view: ChatMessageView = serde_json::from_value(event.data.clone()).ok()?;
        Some(FeedMessage::from(&view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_message_alerts_support_queue() {
        let topics = SupportPolicy.publish_topics("c1", Role::Customer);
        assert_eq!(
            topics,
            vec![
                Topic::AdminBroadcast,
                Topic::CustomerSupport,
                Topic::Conversation("c1".into())
            ]
        );
    }

    #[test]
    fn test_staff_reply_skips_support_queue() {
        for role in [Role::Moderator, Role::Admin, Role::SuperAdmin] {
            let topics = SupportPolicy.publish_topics("c1", role);
            assert_eq!(
                topics,
                vec![Topic::AdminBroadcast, Topic::Conversation("c1".into())]
            );
        }
    }

    #[test]
    fn test_support_subscriptions() {
        let staff = Viewer::new("a1", Role::Admin);
        assert_eq!(
            SupportPolicy.subscription_topics(&staff, None),
            vec![Topic::AdminBroadcast]
        );
        assert_eq!(
            SupportPolicy.subscription_topics(&staff, Some("c1")),
            vec![Topic::AdminBroadcast, Topic::Conversation("c1".into())]
        );

        let customer = Viewer::new("u1", Role::Customer);
        assert_eq!(
            SupportPolicy.subscription_topics(&customer, None),
            vec![Topic::CustomerSupport]
        );
        assert_eq!(
            SupportPolicy.subscription_topics(&customer, Some("c1")),
            vec![Topic::Conversation("c1".into())]
        );
    }

    #[test]
    fn test_chat_room_never_crosses_surfaces() {
        for role in Role::all() {
            assert_eq!(
                ChatRoomPolicy.publish_topics("r1", role),
                vec![Topic::ChatRoom("r1".into())]
            );
        }
        let guest = Viewer::new("guest_1", Role::Customer);
        assert!(ChatRoomPolicy.subscription_topics(&guest, None).is_empty());

        let event = RealtimeEvent::new(
            Topic::Conversation("c1".into()),
            EventKind::NewMessage,
            serde_json::json!({}),
        );
        assert!(ChatRoomPolicy.normalize(&event).is_none());
    }

    #[test]
    fn test_normalize_ignores_other_events() {
        let event = RealtimeEvent::new(
            Topic::Conversation("c1".into()),
            EventKind::Typing,
            serde_json::json!({"typing": true}),
        );
        assert!(SupportPolicy.normalize(&event).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Customer),
            Just(Role::Moderator),
            Just(Role::Admin),
            Just(Role::SuperAdmin),
        ]
    }

    proptest! {
        /// Property: every support message reaches admin-broadcast and its
        /// conversation; customer-support only for customer senders.
        #[test]
        fn prop_support_publish_set(id in "[a-z0-9-]{1,36}", role in role_strategy()) {
            let topics = SupportPolicy.publish_topics(&id, role);
            prop_assert!(topics.contains(&Topic::AdminBroadcast));
            prop_assert!(topics.contains(&Topic::Conversation(id.clone())));
            prop_assert_eq!(topics.contains(&Topic::CustomerSupport), !role.is_staff());
            prop_assert!(topics.iter().all(|t| !matches!(t, Topic::ChatRoom(_))));
        }
    }
}
