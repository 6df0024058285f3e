//! Prometheus instruments owned by the messaging façade.
//!
//! The façade increments these directly; the node registers them next to
//! its HTTP metrics so a single `/metrics` scrape covers both.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Labels of a sent message.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MessageLabels {
    /// `support` or `chat`.
    pub surface: String,
    /// Wire spelling of the sender's role.
    pub sender_role: String,
}

/// Messaging counters and gauges.
#[derive(Clone, Debug, Default)]
pub struct MessagingMetrics {
    /// Messages persisted, by surface and sender role.
    pub messages_sent: Family<MessageLabels, Counter>,
    /// Publishes that failed after the message was persisted.
    pub publish_failures: Counter,
    /// Support conversations currently stored.
    pub conversations: Gauge,
    /// Chat rooms currently stored.
    pub chat_rooms: Gauge,
}

impl MessagingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every instrument under the `parley_` prefix.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "parley_messages_sent",
            "Messages persisted by surface and sender role",
            self.messages_sent.clone(),
        );
        registry.register(
            "parley_publish_failures",
            "Realtime publishes that failed after persistence",
            self.publish_failures.clone(),
        );
        registry.register(
            "parley_conversations",
            "Support conversations stored",
            self.conversations.clone(),
        );
        registry.register(
            "parley_chat_rooms",
            "Direct chat rooms stored",
            self.chat_rooms.clone(),
        );
    }

    pub(crate) fn record_message(&self, surface: &str, sender_role: impl ToString) {
        self.messages_sent
            .get_or_create(&MessageLabels {
                surface: surface.to_string(),
                sender_role: sender_role.to_string(),
            })
            .inc();
    }
}
