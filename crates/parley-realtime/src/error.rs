//! Error types for the real-time module.

use thiserror::Error;

/// Errors that can occur in real-time operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Invalid topic format.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Subscription limit exceeded.
    #[error("subscription limit exceeded: max {0} subscriptions")]
    SubscriptionLimit(usize),

    /// Connection limit reached.
    #[error("connection limit reached: max {0} connections")]
    ConnectionLimit(usize),

    /// Client not found.
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// The presented token does not match any grant.
    #[error("unknown capability token")]
    InvalidToken,

    /// The grant behind the token has expired.
    #[error("capability grant expired")]
    GrantExpired,

    /// The grant does not cover the requested topic or operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The adapter was used after being closed.
    #[error("connection closed")]
    Closed,

    /// The adapter has no live connection.
    #[error("not connected")]
    NotConnected,

    /// The feed source (persistence side) failed.
    #[error("feed source error: {0}")]
    Feed(String),

    /// Guest identity could not be read or written.
    #[error("guest identity error: {0}")]
    Identity(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
