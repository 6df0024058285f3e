//! Client-side conversation list state.

use crate::event::FeedMessage;
use parley_types::{ChatRoom, ConversationSummary, MessageId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// One entry of the local thread list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPreview {
    /// Conversation id or chat room id.
    pub id: String,
    pub title: Option<String>,
    pub owner_id: Option<String>,
    pub last_message: Option<FeedMessage>,
    pub unread: usize,
    pub updated_at: u64,
}

impl From<&ConversationSummary> for ThreadPreview {
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            owner_id: summary.customer_id.clone(),
            last_message: summary.last_message.as_ref().map(FeedMessage::from),
            unread: summary.unread_count.unwrap_or(0),
            updated_at: summary.updated_at,
        }
    }
}

impl From<&ChatRoom> for ThreadPreview {
    fn from(room: &ChatRoom) -> Self {
        Self {
            id: room.id.clone(),
            title: None,
            owner_id: Some(room.owner_id.clone()),
            last_message: None,
            unread: 0,
            updated_at: room.created_at,
        }
    }
}

/// Result of applying an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// The thread preview was updated and moved to the front.
    Updated,
    /// The message was already applied.
    Duplicate,
    /// No local thread has this id.
    Unknown(String),
}

/// Message ids remembered for de-duplication; the oldest are forgotten first.
pub const SEEN_CAPACITY: usize = 1024;

/// In-memory thread list kept consistent with realtime events.
///
/// Threads are ordered most recently updated first. The last
/// [`SEEN_CAPACITY`] message ids applied are remembered so an event
/// delivered on several topics only counts once.
#[derive(Debug, Default)]
pub struct ConversationTracker {
    threads: Vec<ThreadPreview>,
    seen: HashSet<MessageId>,
    seen_order: VecDeque<MessageId>,
}

impl ConversationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fresh fetch.
    pub fn load(&mut self, threads: Vec<ThreadPreview>) {
        self.seen.clear();
        self.seen_order.clear();
        for message in threads.iter().filter_map(|t| t.last_message.as_ref()) {
            self.remember(&message.id);
        }
        self.threads = threads;
    }

    fn remember(&mut self, id: &MessageId) {
        if !self.seen.insert(id.clone()) {
            return;
        }
        self.seen_order.push_back(id.clone());
        while self.seen_order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.seen_order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    /// Insert a freshly fetched thread at the front, replacing any stale copy.
    pub fn insert_front(&mut self, thread: ThreadPreview) {
        self.threads.retain(|t| t.id != thread.id);
        if let Some(last) = &thread.last_message {
            self.remember(&last.id);
        }
        self.threads.insert(0, thread);
    }

    /// Apply an inbound message.
    pub fn apply(&mut self, message: &FeedMessage, counts_as_unread: bool) -> TrackerOutcome {
        if self.seen.contains(&message.id) {
            return TrackerOutcome::Duplicate;
        }
        let Some(pos) = self.threads.iter().position(|t| t.id == message.thread_id) else {
            return TrackerOutcome::Unknown(message.thread_id.clone());
        };

        self.remember(&message.id);
        let mut thread = self.threads.remove(pos);
        thread.updated_at = thread.updated_at.max(message.created_at);
        thread.last_message = Some(message.clone());
        if counts_as_unread {
            thread.unread += 1;
        }
        self.threads.insert(0, thread);
        TrackerOutcome::Updated
    }

    /// Zero a thread's unread counter. Returns false if the thread is unknown.
    pub fn mark_read_local(&mut self, thread_id: &str) -> bool {
        match self.threads.iter_mut().find(|t| t.id == thread_id) {
            Some(thread) => {
                thread.unread = 0;
                true
            }
            None => false,
        }
    }

    pub fn threads(&self) -> &[ThreadPreview] {
        &self.threads
    }

    pub fn get(&self, thread_id: &str) -> Option<&ThreadPreview> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn total_unread(&self) -> usize {
        self.threads.iter().map(|t| t.unread).sum()
    }

    pub fn clear(&mut self) {
        self.threads.clear();
        self.seen.clear();
        self.seen_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::Role;

    fn thread(id: &str, updated_at: u64) -> ThreadPreview {
        ThreadPreview {
            id: id.into(),
            title: Some(format!("Support - {}", id)),
            owner_id: Some(format!("owner-{}", id)),
            last_message: None,
            unread: 0,
            updated_at,
        }
    }

    fn message(id: &str, thread_id: &str, role: Role, at: u64) -> FeedMessage {
        FeedMessage {
            id: id.into(),
            thread_id: thread_id.into(),
            owner_id: None,
            sender_id: "s".into(),
            sender_name: "S".into(),
            sender_role: role,
            content: format!("body {}", id),
            created_at: at,
            read: false,
        }
    }

    #[test]
    fn test_apply_moves_thread_to_front() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 20), thread("b", 10)]);

        let outcome = tracker.apply(&message("m1", "b", Role::Customer, 30), true);
        assert_eq!(outcome, TrackerOutcome::Updated);

        let b = &tracker.threads()[0];
        assert_eq!(b.id, "b");
        assert_eq!(b.unread, 1);
        assert_eq!(b.updated_at, 30);
        assert_eq!(b.last_message.as_ref().unwrap().id, "m1");
    }

    #[test]
    fn test_staff_message_does_not_count() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 1)]);
        tracker.apply(&message("m1", "a", Role::Admin, 2), false);
        assert_eq!(tracker.get("a").unwrap().unread, 0);
        assert_eq!(tracker.get("a").unwrap().last_message.as_ref().unwrap().id, "m1");
    }

    #[test]
    fn test_duplicate_delivery_counts_once() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 1)]);
        let m = message("m1", "a", Role::Customer, 2);

        assert_eq!(tracker.apply(&m, true), TrackerOutcome::Updated);
        assert_eq!(tracker.apply(&m, true), TrackerOutcome::Duplicate);
        assert_eq!(tracker.total_unread(), 1);
    }

    #[test]
    fn test_seen_ids_are_bounded() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 1)]);
        for i in 0..=SEEN_CAPACITY {
            let m = message(&format!("m{}", i), "a", Role::Customer, i as u64);
            assert_eq!(tracker.apply(&m, true), TrackerOutcome::Updated);
        }
        assert_eq!(tracker.seen.len(), SEEN_CAPACITY);
        assert_eq!(tracker.seen_order.len(), SEEN_CAPACITY);

        // The oldest id was forgotten; the newest still de-duplicates.
        let newest = message(&format!("m{}", SEEN_CAPACITY), "a", Role::Customer, 0);
        assert_eq!(tracker.apply(&newest, true), TrackerOutcome::Duplicate);
        assert!(!tracker.seen.contains("m0"));
    }

    #[test]
    fn test_unknown_thread_is_reported_not_inserted() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 1)]);

        let outcome = tracker.apply(&message("m1", "new", Role::Customer, 2), true);
        assert_eq!(outcome, TrackerOutcome::Unknown("new".into()));
        assert_eq!(tracker.threads().len(), 1);

        let mut fetched = thread("new", 2);
        fetched.unread = 1;
        fetched.last_message = Some(message("m1", "new", Role::Customer, 2));
        tracker.insert_front(fetched);

        assert_eq!(tracker.threads()[0].id, "new");
        // The fetched preview already includes m1.
        assert_eq!(
            tracker.apply(&message("m1", "new", Role::Customer, 2), true),
            TrackerOutcome::Duplicate
        );
        assert_eq!(tracker.get("new").unwrap().unread, 1);
    }

    #[test]
    fn test_mark_read_local() {
        let mut tracker = ConversationTracker::new();
        tracker.load(vec![thread("a", 1)]);
        tracker.apply(&message("m1", "a", Role::Customer, 2), true);
        tracker.apply(&message("m2", "a", Role::Customer, 3), true);

        assert!(tracker.mark_read_local("a"));
        assert_eq!(tracker.total_unread(), 0);
        assert!(!tracker.mark_read_local("missing"));
    }
}
