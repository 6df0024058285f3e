//! The messaging façade.

use crate::error::MessagingError;
use crate::metrics::MessagingMetrics;
use crate::Result;
use parley_realtime::{
    CapabilityGrant, ChatRoomPolicy, EventHub, EventKind, FeedMessage, FeedSource, GrantSubject,
    Operation, Publisher, RealtimeError, RoutingPolicy, Surface, SupportPolicy, ThreadPreview,
    Topic, Viewer,
};
use parley_store::{ConversationScope, NewCustomer, NewMessage, SupportStore};
use parley_types::{
    now_millis, ChatMessageView, ChatRoom, ConversationStats, ConversationSummary, Customer,
    CustomerSummary, MessageKind, MessagePage, MessageView, Role, DEFAULT_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Input for [`Messenger::send_message`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub content: String,
    pub sender_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Input for [`Messenger::guest_support_message`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMessage {
    pub guest_id: String,
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity and room handed to a bootstrapped guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSession {
    pub user_id: String,
    pub room_id: String,
}

/// Persists messages, routes them to topics and publishes them.
///
/// Publishing happens strictly after persistence. A publish failure is
/// logged and counted but never turned into an error for the sender, so a
/// durable message may reach realtime subscribers only on their next fetch.
pub struct Messenger {
    store: Arc<SupportStore>,
    hub: Arc<EventHub>,
    publisher: Arc<dyn Publisher>,
    metrics: MessagingMetrics,
}

impl Messenger {
    /// Create a façade publishing through the hub itself.
    pub fn new(store: Arc<SupportStore>, hub: Arc<EventHub>) -> Self {
        let publisher: Arc<dyn Publisher> = hub.clone();
        Self::with_publisher(store, hub, publisher)
    }

    /// Create a façade with a separate publisher (grants still come from `hub`).
    pub fn with_publisher(
        store: Arc<SupportStore>,
        hub: Arc<EventHub>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            store,
            hub,
            publisher,
            metrics: MessagingMetrics::new(),
        }
    }

    pub fn store(&self) -> &Arc<SupportStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Instruments updated by every operation.
    pub fn metrics(&self) -> &MessagingMetrics {
        &self.metrics
    }

    /// Publishes that failed after persistence.
    pub fn publish_failures(&self) -> u64 {
        self.metrics.publish_failures.get()
    }

    fn publish_all<T: Serialize>(&self, topics: &[Topic], event: EventKind, payload: &T) {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                self.record_failure();
                warn!(error = %e, "Failed to encode event payload");
                return;
            }
        };

        for topic in topics {
            if let Err(e) = self.publisher.publish(topic, event, data.clone()) {
                self.record_failure();
                warn!(topic = %topic, event = %event, error = %e, "Publish failed after persist");
            }
        }
    }

    fn record_failure(&self) {
        self.metrics.publish_failures.inc();
        self.hub.record_publish_failure();
    }

    fn require_staff(&self, user_id: &str) -> Result<Customer> {
        let user = self.store.customer(user_id)?;
        if user.role.is_staff() {
            Ok(user)
        } else {
            Err(MessagingError::PermissionDenied(
                "staff role required".to_string(),
            ))
        }
    }

    // ==================== Customers ====================

    /// Register a customer; an existing email returns the existing record.
    pub fn register_customer(&self, new: NewCustomer) -> Result<Customer> {
        Ok(self.store.register_customer(new)?)
    }

    /// Staff directory. Staff only.
    pub fn staff(&self, user_id: &str) -> Result<Vec<CustomerSummary>> {
        self.require_staff(user_id)?;
        Ok(self.store.list_staff())
    }

    // ==================== Support conversations ====================

    /// Persist a message, then publish it on every topic the routing
    /// policy names.
    pub fn send_message(&self, input: SendMessage) -> Result<MessageView> {
        if input.sender_id.trim().is_empty() {
            return Err(MessagingError::Validation("senderId is required".into()));
        }

        let created = self.store.create_message(NewMessage {
            content: input.content,
            kind: input.kind,
            sender_id: input.sender_id,
            conversation_id: input.conversation_id,
            metadata: input.metadata,
        })?;
        let view = created.view;
        self.metrics.record_message("support", view.sender.role);

        if created.opened_conversation {
            self.metrics.conversations.inc();
            let topic = Topic::Conversation(view.conversation.id.clone());
            let extended = self.hub.extend_grants(
                &view.sender.id,
                &topic,
                vec![Operation::Subscribe, Operation::Publish],
            );
            info!(
                conversation_id = %view.conversation.id,
                customer_id = %view.sender.id,
                grants_extended = extended,
                "Conversation opened"
            );
        }

        let topics = SupportPolicy.publish_topics(&view.message.conversation_id, view.sender.role);
        self.publish_all(&topics, EventKind::NewMessage, &view);

        debug!(
            message_id = %view.message.id,
            conversation_id = %view.message.conversation_id,
            topics = topics.len(),
            "Message sent"
        );
        Ok(view)
    }

    /// Conversation list for `user_id`.
    ///
    /// `as_admin` requests the staff view and requires a staff role;
    /// otherwise customers get their own conversations and anyone else is
    /// refused.
    pub fn list_conversations(
        &self,
        user_id: &str,
        as_admin: bool,
    ) -> Result<Vec<ConversationSummary>> {
        let user = self.store.customer(user_id)?;
        let scope = match (as_admin, user.role) {
            (true, role) if role.is_staff() => ConversationScope::Staff,
            (false, Role::Customer) => ConversationScope::Customer(user.id),
            _ => {
                return Err(MessagingError::PermissionDenied(
                    "not allowed to list these conversations".into(),
                ))
            }
        };
        Ok(self.store.list_conversations(&scope))
    }

    /// One conversation in list-entry shape, as `viewer_id` may see it.
    pub fn conversation(
        &self,
        viewer_id: &str,
        conversation_id: &str,
    ) -> Result<ConversationSummary> {
        let viewer = self.store.customer(viewer_id)?;
        if viewer.role.is_staff() {
            return Ok(self.store.conversation_summary(conversation_id, true)?);
        }

        let summary = self.store.conversation_summary(conversation_id, false)?;
        if summary.customer_id.as_deref() == Some(viewer.id.as_str()) {
            Ok(summary)
        } else {
            Err(MessagingError::PermissionDenied(
                "conversation belongs to another customer".into(),
            ))
        }
    }

    /// A page of messages, oldest first.
    pub fn list_messages(
        &self,
        conversation_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<MessagePage<MessageView>> {
        Ok(self.store.list_messages(conversation_id, page, limit)?)
    }

    /// Mark every customer message in a conversation read. Staff only;
    /// idempotent.
    pub fn mark_read(&self, conversation_id: &str, user_id: &str) -> Result<usize> {
        let changed = self.store.mark_read(conversation_id, user_id)?;
        if changed > 0 {
            let payload = serde_json::json!({
                "conversationId": conversation_id,
                "readBy": user_id,
                "count": changed,
            });
            self.publish_all(
                &[Topic::Conversation(conversation_id.to_string())],
                EventKind::MessagesRead,
                &payload,
            );
        }
        Ok(changed)
    }

    /// Dashboard counters. Staff only.
    pub fn stats(&self, user_id: &str) -> Result<ConversationStats> {
        self.require_staff(user_id)?;
        Ok(self.store.stats(now_millis()))
    }

    // ==================== Realtime authorization ====================

    /// Issue a time-boxed capability grant for `user_id`.
    ///
    /// The grant is scoped from the stored role; a `claimed_role` is only
    /// logged when it disagrees and never widens the grant. An id that is
    /// not a registered customer but owns a chat room gets a guest grant
    /// for that room.
    pub fn authorize(&self, user_id: &str, claimed_role: Option<&str>) -> Result<CapabilityGrant> {
        if user_id.trim().is_empty() {
            return Err(MessagingError::Validation("userId is required".into()));
        }

        let subject = match self.store.customer(user_id) {
            Ok(user) => {
                if let Some(claimed) = claimed_role {
                    if Role::parse(claimed) != Some(user.role) {
                        debug!(
                            user_id = %user_id,
                            claimed = %claimed,
                            actual = %user.role,
                            "Ignoring claimed role"
                        );
                    }
                }
                if user.role.is_staff() {
                    GrantSubject::Staff
                } else {
                    GrantSubject::Customer {
                        conversations: self.store.owned_conversation_ids(&user.id),
                        room: self.store.chat_room_for_owner(&user.id).map(|r| r.id),
                    }
                }
            }
            Err(e) if e.is_not_found() => match self.store.chat_room_for_owner(user_id) {
                Some(room) => GrantSubject::Guest { room: room.id },
                None => {
                    return Err(MessagingError::PermissionDenied(
                        "no authenticated identity; use the guest chat bootstrap".into(),
                    ))
                }
            },
            Err(e) => return Err(e.into()),
        };

        Ok(self.hub.issue_grant(user_id, subject.capability()))
    }

    // ==================== Chat rooms ====================

    /// Resolve or create the room of a guest identity. Idempotent.
    pub fn guest_chat(&self, guest_id: &str) -> Result<GuestSession> {
        if guest_id.trim().is_empty() {
            return Err(MessagingError::Validation("guestId is required".into()));
        }
        let room = self.resolve_room(guest_id)?;
        Ok(GuestSession {
            user_id: guest_id.to_string(),
            room_id: room.id,
        })
    }

    /// Resolve or create the room of a registered customer.
    pub fn open_chat(&self, user_id: &str) -> Result<ChatRoom> {
        let user = self.store.customer(user_id)?;
        self.resolve_room(&user.id)
    }

    fn resolve_room(&self, owner_id: &str) -> Result<ChatRoom> {
        if let Some(room) = self.store.chat_room_for_owner(owner_id) {
            return Ok(room);
        }
        let room = self.store.get_or_create_chat_room(owner_id)?;
        self.metrics.chat_rooms.set(self.store.list_chat_rooms().len() as i64);
        Ok(room)
    }

    /// Post into a chat room and publish on its topic only.
    pub fn send_chat_message(
        &self,
        sender_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<ChatMessageView> {
        let view = self.store.send_chat_message(sender_id, room_id, content)?;
        self.metrics.record_message("chat", view.sender.role);
        let topics = ChatRoomPolicy.publish_topics(room_id, view.sender.role);
        self.publish_all(&topics, EventKind::NewMessage, &view);
        Ok(view)
    }

    /// A chat room as `viewer_id` may see it: its owner or any staff member.
    pub fn chat_room(&self, viewer_id: &str, room_id: &str) -> Result<ChatRoom> {
        let role = match self.store.customer(viewer_id) {
            Ok(user) => user.role,
            Err(e) if e.is_not_found() => Role::Customer,
            Err(e) => return Err(e.into()),
        };
        self.visible_room(&Viewer::new(viewer_id, role), room_id)
    }

    /// A page of chat messages, oldest first.
    pub fn list_chat_messages(
        &self,
        room_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<MessagePage<ChatMessageView>> {
        Ok(self.store.list_chat_messages(room_id, page, limit)?)
    }

    /// Post a support message from an unregistered visitor, registering a
    /// customer record for the guest id on first use.
    pub fn guest_support_message(&self, input: GuestMessage) -> Result<MessageView> {
        if input.guest_id.trim().is_empty() {
            return Err(MessagingError::Validation("guestId is required".into()));
        }
        let guest = CustomerSummary::guest(&input.guest_id);
        let customer = self.store.register_customer(NewCustomer {
            id: Some(input.guest_id),
            name: input.name.or(guest.name),
            email: input.email.unwrap_or(guest.email),
            avatar: None,
            role: Role::Customer,
        })?;

        self.send_message(SendMessage {
            content: input.content,
            sender_id: customer.id,
            ..Default::default()
        })
    }

    fn visible_room(&self, viewer: &Viewer, room_id: &str) -> Result<ChatRoom> {
        let room = self.store.chat_room(room_id)?;
        if viewer.is_staff() || room.owner_id == viewer.user_id {
            Ok(room)
        } else {
            Err(MessagingError::PermissionDenied(
                "chat room belongs to someone else".into(),
            ))
        }
    }
}

impl FeedSource for Messenger {
    fn authorize(&self, user_id: &str) -> std::result::Result<CapabilityGrant, RealtimeError> {
        Ok(Messenger::authorize(self, user_id, None)?)
    }

    fn threads(
        &self,
        surface: Surface,
        viewer: &Viewer,
    ) -> std::result::Result<Vec<ThreadPreview>, RealtimeError> {
        match surface {
            Surface::Support => {
                let scope = if viewer.is_staff() {
                    ConversationScope::Staff
                } else {
                    ConversationScope::Customer(viewer.user_id.clone())
                };
                Ok(self
                    .store
                    .list_conversations(&scope)
                    .iter()
                    .map(ThreadPreview::from)
                    .collect())
            }
            Surface::Chat => {
                let rooms = if viewer.is_staff() {
                    self.store.list_chat_rooms()
                } else {
                    self.store
                        .chat_room_for_owner(&viewer.user_id)
                        .into_iter()
                        .collect()
                };
                Ok(rooms.iter().map(ThreadPreview::from).collect())
            }
        }
    }

    fn thread(
        &self,
        surface: Surface,
        viewer: &Viewer,
        thread_id: &str,
    ) -> std::result::Result<ThreadPreview, RealtimeError> {
        match surface {
            Surface::Support => {
                let summary = self.conversation(&viewer.user_id, thread_id)?;
                Ok(ThreadPreview::from(&summary))
            }
            Surface::Chat => {
                let room = self.visible_room(viewer, thread_id)?;
                Ok(ThreadPreview::from(&room))
            }
        }
    }

    fn messages(
        &self,
        surface: Surface,
        viewer: &Viewer,
        thread_id: &str,
    ) -> std::result::Result<Vec<FeedMessage>, RealtimeError> {
        match surface {
            Surface::Support => {
                self.conversation(&viewer.user_id, thread_id)?;
                let page = self.list_messages(thread_id, 1, DEFAULT_PAGE_SIZE)?;
                Ok(page.messages.iter().map(FeedMessage::from).collect())
            }
            Surface::Chat => {
                self.visible_room(viewer, thread_id)?;
                let page = self.list_chat_messages(thread_id, 1, DEFAULT_PAGE_SIZE)?;
                Ok(page.messages.iter().map(FeedMessage::from).collect())
            }
        }
    }

    fn mark_read(
        &self,
        viewer: &Viewer,
        thread_id: &str,
    ) -> std::result::Result<(), RealtimeError> {
        Messenger::mark_read(self, thread_id, &viewer.user_id)?;
        Ok(())
    }
}
