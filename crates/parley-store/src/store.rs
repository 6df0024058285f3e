//! In-memory storage for support messaging data.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use parley_types::{
    now_millis, start_of_day, ChatMessage, ChatMessageView, ChatRoom, ChatRoomId, Conversation,
    ConversationId, ConversationRef, ConversationStats, ConversationSummary, Customer, CustomerId,
    CustomerSummary, Message, MessageKind, MessagePage, MessageStatus, MessageView, Role,
};

use crate::{error::StoreError, Result};

/// Which conversations a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationScope {
    /// Every customer-originated conversation, with unread counts.
    Staff,
    /// Conversations owned by one customer.
    Customer(CustomerId),
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    /// Explicit id; generated when absent.
    pub id: Option<CustomerId>,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

/// Input for creating a conversation message.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub content: String,
    pub kind: MessageKind,
    pub sender_id: CustomerId,
    /// Target conversation; resolved or created for the sender when absent.
    pub conversation_id: Option<ConversationId>,
    pub metadata: Option<serde_json::Value>,
}

/// Result of [`SupportStore::create_message`].
#[derive(Debug, Clone)]
pub struct CreatedMessage {
    /// The persisted message with sender and conversation summaries.
    pub view: MessageView,
    /// True when the call opened a brand-new conversation.
    pub opened_conversation: bool,
}

/// A conversation plus its position in the update ordering.
#[derive(Debug, Clone)]
struct ConversationRecord {
    conversation: Conversation,
    /// Monotonic sequence of the last touch; breaks `updated_at` ties.
    touched: u64,
}

/// In-memory store for support data.
///
/// Thread-safe storage for customers, conversations, messages and the
/// parallel chat-room surface. When more than one table is locked, the
/// order is always `customers`, `conversations`, `messages`.
#[derive(Default)]
pub struct SupportStore {
    /// Customers indexed by id.
    customers: RwLock<HashMap<CustomerId, Customer>>,
    /// Customer id indexed by lowercase email.
    emails: RwLock<HashMap<String, CustomerId>>,
    /// Conversations indexed by id.
    conversations: RwLock<HashMap<ConversationId, ConversationRecord>>,
    /// Messages per conversation, in insertion (chronological) order.
    messages: RwLock<HashMap<ConversationId, Vec<Message>>>,
    /// Chat rooms indexed by id.
    rooms: RwLock<HashMap<ChatRoomId, ChatRoom>>,
    /// Room id indexed by owner.
    room_owners: RwLock<HashMap<String, ChatRoomId>>,
    /// Chat messages per room, chronological.
    chat_messages: RwLock<HashMap<ChatRoomId, Vec<ChatMessage>>>,
    /// Global touch sequence.
    sequence: AtomicU64,
}

impl SupportStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    // ==================== Customers ====================

    /// Registers a customer.
    ///
    /// Registering an email (or id) that already exists returns the
    /// existing record unchanged.
    pub fn register_customer(&self, new: NewCustomer) -> Result<Customer> {
        let email = new.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(StoreError::Validation("email is required".into()));
        }

        let mut customers = self.customers.write();
        let mut emails = self.emails.write();

        if let Some(existing) = emails.get(&email).and_then(|id| customers.get(id)) {
            return Ok(existing.clone());
        }
        if let Some(existing) = new.id.as_ref().and_then(|id| customers.get(id)) {
            return Ok(existing.clone());
        }

        let customer = Customer {
            id: new.id.unwrap_or_else(Self::new_id),
            name: new.name,
            email: email.clone(),
            avatar: new.avatar,
            role: new.role,
            created_at: now_millis(),
        };

        emails.insert(email, customer.id.clone());
        customers.insert(customer.id.clone(), customer.clone());
        debug!(customer_id = %customer.id, role = %customer.role, "Customer registered");
        Ok(customer)
    }

    /// Gets a customer by id.
    pub fn customer(&self, id: &str) -> Result<Customer> {
        self.customers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::CustomerNotFound { id: id.to_string() })
    }

    /// Lists every staff projection.
    pub fn list_staff(&self) -> Vec<CustomerSummary> {
        let mut staff: Vec<CustomerSummary> = self
            .customers
            .read()
            .values()
            .filter(|c| c.role.is_staff())
            .map(Customer::summary)
            .collect();
        staff.sort_by(|a, b| a.email.cmp(&b.email));
        staff
    }

    // ==================== Conversations ====================

    /// Persists a message, opening a conversation for the sender when no
    /// conversation id is given.
    pub fn create_message(&self, new: NewMessage) -> Result<CreatedMessage> {
        if new.content.trim().is_empty() {
            return Err(StoreError::Validation("content is required".into()));
        }

        let customers = self.customers.read();
        let sender = customers
            .get(&new.sender_id)
            .ok_or_else(|| StoreError::CustomerNotFound {
                id: new.sender_id.clone(),
            })?;

        let mut conversations = self.conversations.write();
        let mut opened_conversation = false;

        let conversation_id = match new.conversation_id {
            Some(id) => {
                let record =
                    conversations
                        .get(&id)
                        .ok_or_else(|| StoreError::ConversationNotFound { id: id.clone() })?;
                if !sender.role.is_staff() && !record.conversation.is_owned_by(&sender.id) {
                    return Err(StoreError::PermissionDenied(
                        "customers may only post in their own conversations".into(),
                    ));
                }
                id
            }
            None => {
                if sender.role.is_staff() {
                    return Err(StoreError::PermissionDenied(
                        "Only customers can create new conversations".into(),
                    ));
                }
                match Self::latest_owned(&conversations, &sender.id) {
                    Some(id) => id,
                    None => {
                        let now = now_millis();
                        let conversation = Conversation {
                            id: Self::new_id(),
                            title: Some(format!("Support - {}", sender.display_name())),
                            customer_id: Some(sender.id.clone()),
                            created_at: now,
                            updated_at: now,
                        };
                        let id = conversation.id.clone();
                        conversations.insert(
                            id.clone(),
                            ConversationRecord {
                                conversation,
                                touched: self.next_sequence(),
                            },
                        );
                        opened_conversation = true;
                        debug!(
                            conversation_id = %id,
                            customer_id = %sender.id,
                            "Conversation opened"
                        );
                        id
                    }
                }
            }
        };

        let mut messages = self.messages.write();
        let thread = messages.entry(conversation_id.clone()).or_default();

        // Keep created_at non-decreasing within a thread even if the clock steps back.
        let now = thread
            .last()
            .map_or_else(now_millis, |last| now_millis().max(last.created_at));

        let message = Message {
            id: Self::new_id(),
            content: new.content,
            kind: new.kind,
            status: MessageStatus::Sent,
            conversation_id: conversation_id.clone(),
            sender_id: sender.id.clone(),
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };
        thread.push(message.clone());

        let touched = self.next_sequence();
        let record = conversations.get_mut(&conversation_id).ok_or_else(|| {
            StoreError::ConversationNotFound {
                id: conversation_id.clone(),
            }
        })?;
        record.conversation.updated_at = now;
        record.touched = touched;

        let view = MessageView {
            message,
            sender: sender.summary(),
            conversation: Self::conversation_ref(&record.conversation, &customers),
        };

        Ok(CreatedMessage {
            view,
            opened_conversation,
        })
    }

    fn latest_owned(
        conversations: &HashMap<ConversationId, ConversationRecord>,
        customer_id: &str,
    ) -> Option<ConversationId> {
        conversations
            .values()
            .filter(|r| r.conversation.is_owned_by(customer_id))
            .max_by_key(|r| r.touched)
            .map(|r| r.conversation.id.clone())
    }

    fn conversation_ref(
        conversation: &Conversation,
        customers: &HashMap<CustomerId, Customer>,
    ) -> ConversationRef {
        ConversationRef {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            customer_id: conversation.customer_id.clone(),
            customer: conversation
                .customer_id
                .as_ref()
                .and_then(|id| customers.get(id))
                .map(Customer::summary),
        }
    }

    fn view_of(
        message: &Message,
        conversation: &Conversation,
        customers: &HashMap<CustomerId, Customer>,
    ) -> Option<MessageView> {
        let sender = customers.get(&message.sender_id)?;
        Some(MessageView {
            message: message.clone(),
            sender: sender.summary(),
            conversation: Self::conversation_ref(conversation, customers),
        })
    }

    fn count_unread(thread: &[Message], customers: &HashMap<CustomerId, Customer>) -> usize {
        thread
            .iter()
            .filter(|m| m.is_unread())
            .filter(|m| {
                customers
                    .get(&m.sender_id)
                    .is_some_and(|c| c.role == Role::Customer)
            })
            .count()
    }

    fn summarize(
        record: &ConversationRecord,
        messages: &HashMap<ConversationId, Vec<Message>>,
        customers: &HashMap<CustomerId, Customer>,
        with_unread: bool,
    ) -> ConversationSummary {
        let conversation = &record.conversation;
        let thread = messages
            .get(&conversation.id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        ConversationSummary {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            customer_id: conversation.customer_id.clone(),
            customer: conversation
                .customer_id
                .as_ref()
                .and_then(|id| customers.get(id))
                .map(Customer::summary),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            last_message: thread
                .last()
                .and_then(|m| Self::view_of(m, conversation, customers)),
            message_count: thread.len(),
            unread_count: with_unread.then(|| Self::count_unread(thread, customers)),
        }
    }

    /// Lists conversations, most recently updated first.
    pub fn list_conversations(&self, scope: &ConversationScope) -> Vec<ConversationSummary> {
        let customers = self.customers.read();
        let conversations = self.conversations.read();
        let messages = self.messages.read();

        let mut records: Vec<&ConversationRecord> = conversations
            .values()
            .filter(|r| match scope {
                ConversationScope::Staff => r.conversation.customer_id.is_some(),
                ConversationScope::Customer(id) => r.conversation.is_owned_by(id),
            })
            .collect();

        records.sort_by(|a, b| {
            b.conversation
                .updated_at
                .cmp(&a.conversation.updated_at)
                .then(b.touched.cmp(&a.touched))
        });

        let with_unread = matches!(scope, ConversationScope::Staff);
        records
            .into_iter()
            .map(|r| Self::summarize(r, &messages, &customers, with_unread))
            .collect()
    }

    /// Gets a single conversation in list-entry shape.
    pub fn conversation_summary(
        &self,
        conversation_id: &str,
        with_unread: bool,
    ) -> Result<ConversationSummary> {
        let customers = self.customers.read();
        let conversations = self.conversations.read();
        let messages = self.messages.read();

        let record = conversations.get(conversation_id).ok_or_else(|| {
            StoreError::ConversationNotFound {
                id: conversation_id.to_string(),
            }
        })?;
        Ok(Self::summarize(record, &messages, &customers, with_unread))
    }

    /// Gets the raw conversation record.
    pub fn conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.conversations
            .read()
            .get(conversation_id)
            .map(|r| r.conversation.clone())
            .ok_or_else(|| StoreError::ConversationNotFound {
                id: conversation_id.to_string(),
            })
    }

    /// Ids of every conversation owned by `customer_id`.
    pub fn owned_conversation_ids(&self, customer_id: &str) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self
            .conversations
            .read()
            .values()
            .filter(|r| r.conversation.is_owned_by(customer_id))
            .map(|r| r.conversation.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Lists one page of messages in chronological order.
    ///
    /// Pages are cut newest-first: page 1 holds the `limit` most recent
    /// messages, page 2 the next `limit` older ones, and so on. Each page
    /// is returned oldest first.
    pub fn list_messages(
        &self,
        conversation_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<MessagePage<MessageView>> {
        validate_page(page, limit)?;

        let customers = self.customers.read();
        let conversations = self.conversations.read();
        let messages = self.messages.read();

        let record = conversations.get(conversation_id).ok_or_else(|| {
            StoreError::ConversationNotFound {
                id: conversation_id.to_string(),
            }
        })?;
        let thread = messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut page_items: Vec<MessageView> = thread
            .iter()
            .rev()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .filter_map(|m| Self::view_of(m, &record.conversation, &customers))
            .collect();
        page_items.reverse();

        Ok(MessagePage {
            messages: page_items,
            total: thread.len(),
            page,
            limit,
            total_pages: MessagePage::<MessageView>::page_count(thread.len(), limit),
        })
    }

    /// Marks every unread customer-authored message in a conversation as
    /// read. Staff only; idempotent. Returns the number of messages that
    /// changed status.
    pub fn mark_read(&self, conversation_id: &str, staff_id: &str) -> Result<usize> {
        let customers = self.customers.read();
        let is_staff = customers.get(staff_id).is_some_and(|c| c.role.is_staff());
        if !is_staff {
            return Err(StoreError::PermissionDenied(
                "only staff can mark conversations as read".into(),
            ));
        }

        if !self.conversations.read().contains_key(conversation_id) {
            return Err(StoreError::ConversationNotFound {
                id: conversation_id.to_string(),
            });
        }

        let now = now_millis();
        let mut messages = self.messages.write();
        let changed = messages
            .get_mut(conversation_id)
            .map(|thread| {
                thread
                    .iter_mut()
                    .filter(|m| {
                        customers
                            .get(&m.sender_id)
                            .is_some_and(|c| c.role == Role::Customer)
                    })
                    .map(|m| m.mark_read(now))
                    .filter(|changed| *changed)
                    .count()
            })
            .unwrap_or(0);

        debug!(conversation_id = %conversation_id, changed, "Conversation marked read");
        Ok(changed)
    }

    /// Unread customer-authored messages in a conversation.
    pub fn unread_count(&self, conversation_id: &str) -> Result<usize> {
        let customers = self.customers.read();
        if !self.conversations.read().contains_key(conversation_id) {
            return Err(StoreError::ConversationNotFound {
                id: conversation_id.to_string(),
            });
        }
        let messages = self.messages.read();
        Ok(messages
            .get(conversation_id)
            .map(|thread| Self::count_unread(thread, &customers))
            .unwrap_or(0))
    }

    /// Dashboard counters, with "today" measured from UTC midnight of `now`.
    pub fn stats(&self, now: u64) -> ConversationStats {
        let customers = self.customers.read();
        let conversations = self.conversations.read();
        let messages = self.messages.read();
        let midnight = start_of_day(now);

        let customer_owned: Vec<&ConversationRecord> = conversations
            .values()
            .filter(|r| r.conversation.customer_id.is_some())
            .collect();

        let unread_conversations = customer_owned
            .iter()
            .filter(|r| {
                messages
                    .get(&r.conversation.id)
                    .is_some_and(|t| Self::count_unread(t, &customers) > 0)
            })
            .count();

        let all = || messages.values().flat_map(|t| t.iter());

        ConversationStats {
            total_conversations: customer_owned.len(),
            unread_conversations,
            total_messages: all().count(),
            today_messages: all().filter(|m| m.created_at >= midnight).count(),
        }
    }

    // ==================== Chat rooms ====================

    /// Returns the room owned by `owner_id`, creating it on first use.
    ///
    /// The owner may be a registered customer or a guest token.
    pub fn get_or_create_chat_room(&self, owner_id: &str) -> Result<ChatRoom> {
        if owner_id.trim().is_empty() {
            return Err(StoreError::Validation("owner id is required".into()));
        }

        let mut owners = self.room_owners.write();
        if let Some(room) = owners
            .get(owner_id)
            .and_then(|id| self.rooms.read().get(id).cloned())
        {
            return Ok(room);
        }

        let room = ChatRoom {
            id: Self::new_id(),
            owner_id: owner_id.to_string(),
            created_at: now_millis(),
        };
        owners.insert(owner_id.to_string(), room.id.clone());
        self.rooms.write().insert(room.id.clone(), room.clone());
        debug!(room_id = %room.id, owner_id = %owner_id, "Chat room created");
        Ok(room)
    }

    /// Gets a chat room by id.
    pub fn chat_room(&self, room_id: &str) -> Result<ChatRoom> {
        self.rooms
            .read()
            .get(room_id)
            .cloned()
            .ok_or_else(|| StoreError::ChatRoomNotFound {
                id: room_id.to_string(),
            })
    }

    /// Lists every chat room, newest first.
    pub fn list_chat_rooms(&self) -> Vec<ChatRoom> {
        let mut rooms: Vec<ChatRoom> = self.rooms.read().values().cloned().collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        rooms
    }

    /// Gets the room owned by `owner_id`, if any.
    pub fn chat_room_for_owner(&self, owner_id: &str) -> Option<ChatRoom> {
        let owners = self.room_owners.read();
        let room_id = owners.get(owner_id)?;
        self.rooms.read().get(room_id).cloned()
    }

    fn chat_sender(&self, sender_id: &str, room: &ChatRoom) -> Option<CustomerSummary> {
        match self.customers.read().get(sender_id) {
            Some(c) if c.role.is_staff() || room.owner_id == sender_id => Some(c.summary()),
            Some(_) => None,
            None if room.owner_id == sender_id => Some(CustomerSummary::guest(sender_id)),
            None => None,
        }
    }

    /// Posts a message into a chat room. Only the owner or staff may post.
    pub fn send_chat_message(
        &self,
        sender_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<ChatMessageView> {
        if content.trim().is_empty() {
            return Err(StoreError::Validation("message is required".into()));
        }

        let room = self.chat_room(room_id)?;
        let sender = self.chat_sender(sender_id, &room).ok_or_else(|| {
            StoreError::PermissionDenied(format!("{} may not post in room {}", sender_id, room_id))
        })?;

        let mut chat_messages = self.chat_messages.write();
        let thread = chat_messages.entry(room.id.clone()).or_default();
        let now = thread
            .last()
            .map_or_else(now_millis, |last| now_millis().max(last.created_at));

        let message = ChatMessage {
            id: Self::new_id(),
            room_id: room.id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: now,
        };
        thread.push(message.clone());

        Ok(ChatMessageView { message, sender })
    }

    /// Lists one page of chat messages; same paging contract as
    /// [`SupportStore::list_messages`].
    pub fn list_chat_messages(
        &self,
        room_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<MessagePage<ChatMessageView>> {
        validate_page(page, limit)?;
        let room = self.chat_room(room_id)?;

        let chat_messages = self.chat_messages.read();
        let thread = chat_messages
            .get(room_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut page_items: Vec<ChatMessageView> = thread
            .iter()
            .rev()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(|m| ChatMessageView {
                message: m.clone(),
                sender: self
                    .chat_sender(&m.sender_id, &room)
                    .unwrap_or_else(|| CustomerSummary::guest(&m.sender_id)),
            })
            .collect();
        page_items.reverse();

        Ok(MessagePage {
            messages: page_items,
            total: thread.len(),
            page,
            limit,
            total_pages: MessagePage::<ChatMessageView>::page_count(thread.len(), limit),
        })
    }
}

fn validate_page(page: usize, limit: usize) -> Result<()> {
    if page == 0 {
        return Err(StoreError::Validation("page starts at 1".into()));
    }
    if limit == 0 {
        return Err(StoreError::Validation("limit must be positive".into()));
    }
    Ok(())
}
