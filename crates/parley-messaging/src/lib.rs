//! Messaging façade for Parley.
//!
//! [`Messenger`] is the operation surface HTTP handlers and realtime
//! clients call: send, fetch, mark-read, list-conversations, realtime
//! authorization and the chat-room surface. It persists through
//! [`parley_store::SupportStore`], computes topics with the routing
//! policies from [`parley_realtime`], and publishes after persistence.
//!
//! It also implements [`parley_realtime::FeedSource`], so a
//! [`parley_realtime::RealtimeAdapter`] can be driven directly from it.

mod error;
mod messenger;
pub mod metrics;

pub use error::MessagingError;
pub use messenger::{GuestMessage, GuestSession, Messenger, SendMessage};
pub use metrics::{MessageLabels, MessagingMetrics};

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
