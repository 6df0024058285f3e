//! Per-session realtime client adapter.
//!
//! One adapter owns one live connection for one messaging surface. It
//! turns the viewer's role and selected thread into a subscription set,
//! feeds inbound events into a [`ConversationTracker`] and a message feed,
//! and re-fetches from its [`FeedSource`] whenever it (re)connects, since
//! events published while disconnected are not replayed.

use crate::error::RealtimeError;
use crate::event::{FeedMessage, RealtimeEvent};
use crate::grant::CapabilityGrant;
use crate::hub::ClientCommand;
use crate::policy::{RoutingPolicy, Surface, Viewer};
use crate::topic::Topic;
use crate::tracker::{ConversationTracker, ThreadPreview, TrackerOutcome};
use crate::transport::{Connection, Transport};
use parley_types::MessageId;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

/// The persistence side as seen by a client session.
pub trait FeedSource: Send + Sync {
    /// Obtain a capability grant for `user_id`.
    fn authorize(&self, user_id: &str) -> Result<CapabilityGrant, RealtimeError>;

    /// Every thread visible to `viewer` on `surface`, newest first.
    fn threads(
        &self,
        surface: Surface,
        viewer: &Viewer,
    ) -> Result<Vec<ThreadPreview>, RealtimeError>;

    /// A single thread visible to `viewer`.
    fn thread(
        &self,
        surface: Surface,
        viewer: &Viewer,
        thread_id: &str,
    ) -> Result<ThreadPreview, RealtimeError>;

    /// The most recent page of a thread, oldest first.
    fn messages(
        &self,
        surface: Surface,
        viewer: &Viewer,
        thread_id: &str,
    ) -> Result<Vec<FeedMessage>, RealtimeError>;

    /// Mark a support conversation read on behalf of `viewer`.
    fn mark_read(&self, viewer: &Viewer, thread_id: &str) -> Result<(), RealtimeError>;
}

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

/// Realtime client adapter for one surface.
pub struct RealtimeAdapter<P: RoutingPolicy> {
    policy: P,
    viewer: Viewer,
    transport: Arc<dyn Transport>,
    source: Arc<dyn FeedSource>,
    state: ConnectionState,
    connection: Option<Connection>,
    subscribed: BTreeSet<Topic>,
    selected: Option<String>,
    tracker: ConversationTracker,
    feed: Vec<FeedMessage>,
    feed_ids: HashSet<MessageId>,
}

impl<P: RoutingPolicy> RealtimeAdapter<P> {
    /// Create an adapter; nothing happens until [`connect`](Self::connect).
    pub fn new(
        policy: P,
        viewer: Viewer,
        transport: Arc<dyn Transport>,
        source: Arc<dyn FeedSource>,
    ) -> Self {
        Self {
            policy,
            viewer,
            transport,
            source,
            state: ConnectionState::Connecting,
            connection: None,
            subscribed: BTreeSet::new(),
            selected: None,
            tracker: ConversationTracker::new(),
            feed: Vec::new(),
            feed_ids: HashSet::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn threads(&self) -> &[ThreadPreview] {
        self.tracker.threads()
    }

    pub fn tracker(&self) -> &ConversationTracker {
        &self.tracker
    }

    /// Messages of the selected thread, oldest first.
    pub fn feed(&self) -> &[FeedMessage] {
        &self.feed
    }

    /// Topics currently subscribed.
    pub fn subscriptions(&self) -> Vec<Topic> {
        self.subscribed.iter().cloned().collect()
    }

    /// Hub-side id of the live connection.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.client_id.as_str())
    }

    /// Authenticate, open the connection, subscribe and load state.
    pub fn connect(&mut self) -> Result<(), RealtimeError> {
        match self.state {
            ConnectionState::Closed => return Err(RealtimeError::Closed),
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Connecting | ConnectionState::Disconnected => {}
        }

        self.state = ConnectionState::Connecting;
        match self.establish() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(
                    user_id = %self.viewer.user_id,
                    surface = ?self.policy.surface(),
                    topics = self.subscribed.len(),
                    "Realtime session connected"
                );
                Ok(())
            }
            Err(e) => {
                self.drop_connection();
                warn!(user_id = %self.viewer.user_id, error = %e, "Realtime connect failed");
                Err(e)
            }
        }
    }

    /// Re-establish a dropped session with the same selection, then
    /// re-fetch everything the session may have missed.
    pub fn reconnect(&mut self) -> Result<(), RealtimeError> {
        debug!(user_id = %self.viewer.user_id, "Reconnecting realtime session");
        self.connect()
    }

    fn establish(&mut self) -> Result<(), RealtimeError> {
        let grant = self.source.authorize(&self.viewer.user_id)?;
        self.connection = Some(self.transport.open(&grant.token)?);
        self.subscribed.clear();
        self.sync_subscriptions()?;
        self.refresh()
    }

    fn drop_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.transport.close(connection);
        }
        self.subscribed.clear();
        self.state = ConnectionState::Disconnected;
    }

    /// Reload the thread list and the selected thread from the source.
    pub fn refresh(&mut self) -> Result<(), RealtimeError> {
        let threads = self.source.threads(self.policy.surface(), &self.viewer)?;
        self.tracker.load(threads);
        if let Some(id) = self.selected.clone() {
            self.load_feed(&id)?;
        }
        Ok(())
    }

    fn load_feed(&mut self, thread_id: &str) -> Result<(), RealtimeError> {
        let messages = self
            .source
            .messages(self.policy.surface(), &self.viewer, thread_id)?;
        self.feed_ids = messages.iter().map(|m| m.id.clone()).collect();
        self.feed = messages;
        Ok(())
    }

    fn sync_subscriptions(&mut self) -> Result<(), RealtimeError> {
        let Some(connection) = self.connection.as_ref() else {
            return Ok(());
        };

        let desired: BTreeSet<Topic> = self
            .policy
            .subscription_topics(&self.viewer, self.selected.as_deref())
            .into_iter()
            .collect();

        let stale: Vec<Topic> = self.subscribed.difference(&desired).cloned().collect();
        for topic in stale {
            self.transport.command(
                connection,
                ClientCommand::Unsubscribe {
                    channel: topic.to_string(),
                },
            )?;
            self.subscribed.remove(&topic);
        }

        let fresh: Vec<Topic> = desired.difference(&self.subscribed).cloned().collect();
        for topic in fresh {
            self.transport.command(
                connection,
                ClientCommand::Subscribe {
                    channel: topic.to_string(),
                },
            )?;
            self.subscribed.insert(topic);
        }
        Ok(())
    }

    /// Open a thread (or none). Subscriptions follow the selection; the
    /// feed is loaded when connected.
    pub fn select(&mut self, thread_id: Option<&str>) -> Result<(), RealtimeError> {
        if self.state == ConnectionState::Closed {
            return Err(RealtimeError::Closed);
        }
        self.selected = thread_id.map(String::from);
        self.feed.clear();
        self.feed_ids.clear();

        if self.state != ConnectionState::Connected {
            return Ok(());
        }
        self.sync_subscriptions()?;
        if let Some(id) = thread_id {
            self.load_feed(id)?;
        }
        Ok(())
    }

    /// Mark a thread read: the local counter is zeroed first and is not
    /// restored if the source call fails.
    pub fn mark_read(&mut self, thread_id: &str) -> Result<(), RealtimeError> {
        self.tracker.mark_read_local(thread_id);
        for message in self.feed.iter_mut().filter(|m| m.thread_id == thread_id) {
            message.read = true;
        }
        self.source.mark_read(&self.viewer, thread_id).inspect_err(|e| {
            warn!(thread_id = %thread_id, error = %e, "Mark read failed; local state kept");
        })
    }

    /// Drain pending frames. Returns the number of messages applied.
    ///
    /// A closed receiver drops the session and one reconnect is attempted
    /// straight away. A session left `Disconnected` retries on every pump.
    pub fn pump(&mut self) -> usize {
        if self.state == ConnectionState::Disconnected {
            self.restore();
        }

        let mut frames = Vec::new();
        let mut lost = false;

        if let Some(connection) = self.connection.as_mut() {
            loop {
                match connection.receiver.try_recv() {
                    Ok(frame) => frames.push(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        lost = true;
                        break;
                    }
                }
            }
        }

        let mut applied = 0;
        for frame in frames {
            // Control replies share the socket; only event frames matter here.
            if let Ok(event) = serde_json::from_str::<RealtimeEvent>(&frame) {
                if self.handle_event(&event) {
                    applied += 1;
                }
            }
        }

        if lost && self.state == ConnectionState::Connected {
            warn!(user_id = %self.viewer.user_id, "Realtime transport lost");
            self.drop_connection();
            self.restore();
        }
        applied
    }

    fn restore(&mut self) {
        if let Err(e) = self.reconnect() {
            warn!(
                user_id = %self.viewer.user_id,
                error = %e,
                "Automatic reconnect failed; staying disconnected"
            );
        }
    }

    /// Apply one inbound event. Returns true if any local state changed.
    pub fn handle_event(&mut self, event: &RealtimeEvent) -> bool {
        match self.policy.normalize(event) {
            Some(message) => self.apply_message(message),
            None => false,
        }
    }

    fn apply_message(&mut self, message: FeedMessage) -> bool {
        let own_thread = message.owner_id.as_deref() == Some(self.viewer.user_id.as_str());
        if self.policy.surface() == Surface::Support && !self.viewer.is_staff() {
            if message.owner_id.is_some() && !own_thread {
                return false;
            }
            if self.selected.is_none() && own_thread {
                self.adopt(&message.thread_id);
            }
        }

        let counts = self.viewer.is_staff() && self.policy.counts_as_unread(&message);
        let mut changed = match self.tracker.apply(&message, counts) {
            TrackerOutcome::Updated => true,
            TrackerOutcome::Duplicate => false,
            TrackerOutcome::Unknown(thread_id) => self.fetch_thread(&thread_id),
        };

        if self.selected.as_deref() == Some(message.thread_id.as_str())
            && self.feed_ids.insert(message.id.clone())
        {
            self.feed.push(message);
            changed = true;
        }
        changed
    }

    fn adopt(&mut self, thread_id: &str) {
        debug!(thread_id = %thread_id, "Adopting newly opened conversation");
        if let Err(e) = self.select(Some(thread_id)) {
            warn!(thread_id = %thread_id, error = %e, "Failed to open new conversation");
        }
    }

    fn fetch_thread(&mut self, thread_id: &str) -> bool {
        match self
            .source
            .thread(self.policy.surface(), &self.viewer, thread_id)
        {
            Ok(thread) => {
                debug!(thread_id = %thread_id, "Fetched thread unknown to local list");
                self.tracker.insert_front(thread);
                true
            }
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Dropping event for unknown thread");
                false
            }
        }
    }

    /// Release every subscription and close the connection for good.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            for topic in &self.subscribed {
                let _ = self.transport.command(
                    &connection,
                    ClientCommand::Unsubscribe {
                        channel: topic.to_string(),
                    },
                );
            }
            self.transport.close(connection);
        }
        self.subscribed.clear();
        self.state = ConnectionState::Closed;
        info!(user_id = %self.viewer.user_id, "Realtime session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::grant::GrantSubject;
    use crate::hub::{EventHub, Publisher};
    use crate::policy::{ChatRoomPolicy, SupportPolicy};
    use crate::transport::HubTransport;
    use parking_lot::Mutex;
    use parley_types::Role;

    /// Source serving fixed threads, counting calls.
    struct FakeSource {
        hub: Arc<EventHub>,
        subject: GrantSubject,
        threads: Mutex<Vec<ThreadPreview>>,
        messages: Mutex<Vec<FeedMessage>>,
        thread_fetches: Mutex<usize>,
        thread_loads: Mutex<usize>,
        fail_mark_read: bool,
        offline: Mutex<bool>,
    }

    impl FakeSource {
        fn new(hub: Arc<EventHub>, subject: GrantSubject) -> Self {
            Self {
                hub,
                subject,
                threads: Mutex::new(Vec::new()),
                messages: Mutex::new(Vec::new()),
                thread_fetches: Mutex::new(0),
                thread_loads: Mutex::new(0),
                fail_mark_read: false,
                offline: Mutex::new(false),
            }
        }
    }

    impl FeedSource for FakeSource {
        fn authorize(&self, user_id: &str) -> Result<CapabilityGrant, RealtimeError> {
            if *self.offline.lock() {
                return Err(RealtimeError::Feed("offline".into()));
            }
            Ok(self.hub.issue_grant(user_id, self.subject.capability()))
        }

        fn threads(&self, _: Surface, _: &Viewer) -> Result<Vec<ThreadPreview>, RealtimeError> {
            *self.thread_loads.lock() += 1;
            Ok(self.threads.lock().clone())
        }

        fn thread(&self, _: Surface, _: &Viewer, id: &str) -> Result<ThreadPreview, RealtimeError> {
            *self.thread_fetches.lock() += 1;
            self.threads
                .lock()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| RealtimeError::Feed(format!("no thread {}", id)))
        }

        fn messages(
            &self,
            _: Surface,
            _: &Viewer,
            id: &str,
        ) -> Result<Vec<FeedMessage>, RealtimeError> {
            Ok(self
                .messages
                .lock()
                .iter()
                .filter(|m| m.thread_id == id)
                .cloned()
                .collect())
        }

        fn mark_read(&self, _: &Viewer, _: &str) -> Result<(), RealtimeError> {
            if self.fail_mark_read {
                Err(RealtimeError::Feed("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    fn preview(id: &str, owner: &str) -> ThreadPreview {
        ThreadPreview {
            id: id.into(),
            title: Some(format!("Support - {}", owner)),
            owner_id: Some(owner.into()),
            last_message: None,
            unread: 0,
            updated_at: 1,
        }
    }

    fn view_json(
        id: &str,
        conversation: &str,
        owner: &str,
        sender_role: Role,
    ) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "content": format!("text {}", id),
            "type": "TEXT",
            "status": "SENT",
            "conversationId": conversation,
            "senderId": if sender_role == Role::Customer { owner } else { "staff-1" },
            "createdAt": 10,
            "updatedAt": 10,
            "sender": {
                "id": if sender_role == Role::Customer { owner } else { "staff-1" },
                "name": null,
                "email": "x@shop.test",
                "avatar": null,
                "role": sender_role,
            },
            "conversation": {
                "id": conversation,
                "title": null,
                "customerId": owner,
                "customer": null,
            }
        })
    }

    fn publish_support(hub: &EventHub, id: &str, conversation: &str, owner: &str, role: Role) {
        for topic in SupportPolicy.publish_topics(conversation, role) {
            hub.publish(&topic, EventKind::NewMessage, view_json(id, conversation, owner, role))
                .unwrap();
        }
    }

    fn staff_adapter(
        hub: &Arc<EventHub>,
        source: Arc<FakeSource>,
    ) -> RealtimeAdapter<SupportPolicy> {
        RealtimeAdapter::new(
            SupportPolicy,
            Viewer::new("admin-1", Role::Admin),
            Arc::new(HubTransport::new(hub.clone())),
            source,
        )
    }

    #[tokio::test]
    async fn test_staff_connects_to_admin_broadcast() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, source);
        assert_eq!(adapter.state(), ConnectionState::Connecting);
        adapter.connect().unwrap();

        assert_eq!(adapter.state(), ConnectionState::Connected);
        assert_eq!(adapter.subscriptions(), vec![Topic::AdminBroadcast]);
        assert_eq!(adapter.threads().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_counts_once() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, source);
        adapter.connect().unwrap();
        adapter.select(Some("c1")).unwrap();

        // Arrives on admin-broadcast and conversation:c1.
        publish_support(&hub, "m1", "c1", "cust-1", Role::Customer);
        assert_eq!(adapter.pump(), 1);

        let thread = adapter.tracker().get("c1").unwrap();
        assert_eq!(thread.unread, 1);
        assert_eq!(adapter.feed().len(), 1);
    }

    #[tokio::test]
    async fn test_staff_reply_updates_preview_without_unread() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, source);
        adapter.connect().unwrap();

        publish_support(&hub, "m1", "c1", "cust-1", Role::Admin);
        adapter.pump();

        let thread = adapter.tracker().get("c1").unwrap();
        assert_eq!(thread.unread, 0);
        assert_eq!(thread.last_message.as_ref().unwrap().id, "m1");
    }

    #[tokio::test]
    async fn test_unknown_conversation_triggers_incremental_fetch() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));

        let mut adapter = staff_adapter(&hub, source.clone());
        adapter.connect().unwrap();
        assert!(adapter.threads().is_empty());

        // Persisted before the event is published.
        let mut fresh = preview("c9", "cust-9");
        fresh.unread = 1;
        source.threads.lock().push(fresh);

        publish_support(&hub, "m1", "c9", "cust-9", Role::Customer);
        assert_eq!(adapter.pump(), 1);
        assert_eq!(*source.thread_fetches.lock(), 1);
        assert_eq!(adapter.threads()[0].id, "c9");
        assert_eq!(adapter.threads()[0].unread, 1);
    }

    #[tokio::test]
    async fn test_unknown_conversation_dropped_when_fetch_fails() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        let mut adapter = staff_adapter(&hub, source);
        adapter.connect().unwrap();

        publish_support(&hub, "m1", "ghost", "cust-9", Role::Customer);
        assert_eq!(adapter.pump(), 0);
        assert!(adapter.threads().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_then_reconnect_resubscribes_and_refetches() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, source.clone());
        adapter.connect().unwrap();
        adapter.select(Some("c1")).unwrap();

        *source.offline.lock() = true;
        let connection_id = adapter.connection_id().unwrap().to_string();
        hub.disconnect(&connection_id);
        adapter.pump();
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
        assert!(adapter.subscriptions().is_empty());

        // Missed while disconnected; no replay.
        publish_support(&hub, "m1", "c1", "cust-1", Role::Customer);

        *source.offline.lock() = false;
        adapter.reconnect().unwrap();
        assert_eq!(adapter.state(), ConnectionState::Connected);
        assert_eq!(
            adapter.subscriptions(),
            vec![Topic::AdminBroadcast, Topic::Conversation("c1".into())]
        );
        assert_eq!(*source.thread_loads.lock(), 2);
        assert_eq!(adapter.pump(), 0);
    }

    fn feed_message(id: &str, thread: &str, owner: &str) -> FeedMessage {
        FeedMessage {
            id: id.into(),
            thread_id: thread.into(),
            owner_id: Some(owner.into()),
            sender_id: owner.into(),
            sender_name: owner.into(),
            sender_role: Role::Customer,
            content: format!("text {}", id),
            created_at: 10,
            read: false,
        }
    }

    #[tokio::test]
    async fn test_pump_restores_lost_connection() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, source.clone());
        adapter.connect().unwrap();
        adapter.select(Some("c1")).unwrap();
        assert!(adapter.feed().is_empty());

        let connection_id = adapter.connection_id().unwrap().to_string();
        hub.disconnect(&connection_id);
        // Persisted while the socket was gone.
        source.messages.lock().push(feed_message("m1", "c1", "cust-1"));

        adapter.pump();
        assert_eq!(adapter.state(), ConnectionState::Connected);
        assert_ne!(adapter.connection_id(), Some(connection_id.as_str()));
        assert_eq!(
            adapter.subscriptions(),
            vec![Topic::AdminBroadcast, Topic::Conversation("c1".into())]
        );
        assert_eq!(*source.thread_loads.lock(), 2);
        assert_eq!(adapter.feed().len(), 1);
        assert_eq!(hub.connection_count(), 1);

        // Live again.
        publish_support(&hub, "m2", "c1", "cust-1", Role::Customer);
        assert_eq!(adapter.pump(), 1);
        assert_eq!(adapter.feed().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_restore_retries_on_next_pump() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        let mut adapter = staff_adapter(&hub, source.clone());
        adapter.connect().unwrap();

        *source.offline.lock() = true;
        let connection_id = adapter.connection_id().unwrap().to_string();
        hub.disconnect(&connection_id);
        adapter.pump();
        adapter.pump();
        assert_eq!(adapter.state(), ConnectionState::Disconnected);
        assert_eq!(hub.connection_count(), 0);

        *source.offline.lock() = false;
        adapter.pump();
        assert_eq!(adapter.state(), ConnectionState::Connected);
        assert_eq!(adapter.subscriptions(), vec![Topic::AdminBroadcast]);
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(hub.clone(), GrantSubject::Staff));
        let mut adapter = staff_adapter(&hub, source);
        adapter.connect().unwrap();

        adapter.close();
        assert_eq!(adapter.state(), ConnectionState::Closed);
        assert_eq!(hub.connection_count(), 0);
        assert!(matches!(adapter.connect(), Err(RealtimeError::Closed)));
    }

    #[tokio::test]
    async fn test_mark_read_is_optimistic() {
        let hub = Arc::new(EventHub::new());
        let mut source = FakeSource::new(hub.clone(), GrantSubject::Staff);
        source.fail_mark_read = true;
        source.threads.lock().push(preview("c1", "cust-1"));

        let mut adapter = staff_adapter(&hub, Arc::new(source));
        adapter.connect().unwrap();
        publish_support(&hub, "m1", "c1", "cust-1", Role::Customer);
        adapter.pump();
        assert_eq!(adapter.tracker().total_unread(), 1);

        assert!(adapter.mark_read("c1").is_err());
        assert_eq!(adapter.tracker().total_unread(), 0);
    }

    #[tokio::test]
    async fn test_customer_adopts_new_conversation() {
        let hub = Arc::new(EventHub::new());
        let subject = GrantSubject::Customer {
            conversations: vec!["c1".into()],
            room: None,
        };
        let source = Arc::new(FakeSource::new(hub.clone(), subject));
        let mut adapter = RealtimeAdapter::new(
            SupportPolicy,
            Viewer::new("cust-1", Role::Customer),
            Arc::new(HubTransport::new(hub.clone())),
            source.clone(),
        );
        adapter.connect().unwrap();
        assert_eq!(adapter.subscriptions(), vec![Topic::CustomerSupport]);

        source.threads.lock().push(preview("c1", "cust-1"));
        // Another customer's message on the shared queue is ignored.
        publish_support(&hub, "m0", "c0", "cust-0", Role::Customer);
        publish_support(&hub, "m1", "c1", "cust-1", Role::Customer);
        adapter.pump();

        assert_eq!(adapter.selected(), Some("c1"));
        assert_eq!(adapter.subscriptions(), vec![Topic::Conversation("c1".into())]);
        assert_eq!(adapter.threads().len(), 1);
        assert!(adapter.tracker().get("c0").is_none());
    }

    #[tokio::test]
    async fn test_chat_adapter_is_independent() {
        let hub = Arc::new(EventHub::new());
        let source = Arc::new(FakeSource::new(
            hub.clone(),
            GrantSubject::Guest { room: "r1".into() },
        ));
        let mut chat = RealtimeAdapter::new(
            ChatRoomPolicy,
            Viewer::new("guest_abc", Role::Customer),
            Arc::new(HubTransport::new(hub.clone())),
            source,
        );
        chat.connect().unwrap();
        assert!(chat.subscriptions().is_empty());

        chat.select(Some("r1")).unwrap();
        assert_eq!(chat.subscriptions(), vec![Topic::ChatRoom("r1".into())]);

        // A guest grant covers only its own room.
        assert!(matches!(
            chat.select(Some("r2")),
            Err(RealtimeError::PermissionDenied(_))
        ));
        assert!(chat.subscriptions().is_empty());

        let payload = serde_json::json!({
            "id": "cm1",
            "roomId": "r1",
            "senderId": "guest_abc",
            "content": "hi",
            "createdAt": 5,
            "sender": {
                "id": "guest_abc",
                "name": "Guest",
                "email": "guest-guest_abc@guest.local",
                "avatar": null,
                "role": "CUSTOMER"
            }
        });
        chat.select(Some("r1")).unwrap();
        hub.publish(&Topic::ChatRoom("r1".into()), EventKind::NewMessage, payload)
            .unwrap();
        assert_eq!(chat.pump(), 1);
        assert_eq!(chat.feed()[0].content, "hi");
    }
}
