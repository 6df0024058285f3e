//! Error types for messaging operations.

use parley_realtime::RealtimeError;
use parley_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the messaging façade.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// Sender, conversation or room does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller's role does not allow the operation.
    #[error("{0}")]
    PermissionDenied(String),

    /// Realtime delivery failed. Never returned for a message that was
    /// already persisted.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<StoreError> for MessagingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => MessagingError::Validation(msg),
            StoreError::PermissionDenied(msg) => MessagingError::PermissionDenied(msg),
            not_found @ (StoreError::CustomerNotFound { .. }
            | StoreError::ConversationNotFound { .. }
            | StoreError::ChatRoomNotFound { .. }) => {
                MessagingError::NotFound(not_found.to_string())
            }
        }
    }
}

impl From<RealtimeError> for MessagingError {
    fn from(err: RealtimeError) -> Self {
        match err {
            RealtimeError::PermissionDenied(msg) => MessagingError::PermissionDenied(msg),
            RealtimeError::InvalidToken | RealtimeError::GrantExpired => {
                MessagingError::PermissionDenied(err.to_string())
            }
            RealtimeError::InvalidTopic(msg) => MessagingError::Validation(msg),
            other => MessagingError::Transport(other.to_string()),
        }
    }
}

impl From<MessagingError> for RealtimeError {
    fn from(err: MessagingError) -> Self {
        match err {
            MessagingError::PermissionDenied(msg) => RealtimeError::PermissionDenied(msg),
            other => RealtimeError::Feed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let err: MessagingError = StoreError::CustomerNotFound { id: "x".into() }.into();
        assert!(matches!(err, MessagingError::NotFound(_)));
        assert_eq!(err.to_string(), "customer not found: x");

        let err: MessagingError =
            StoreError::PermissionDenied("Only customers can create new conversations".into())
                .into();
        assert_eq!(err.to_string(), "Only customers can create new conversations");
    }

    #[test]
    fn test_realtime_errors_map_to_taxonomy() {
        let err: MessagingError = RealtimeError::GrantExpired.into();
        assert!(matches!(err, MessagingError::PermissionDenied(_)));

        let err: MessagingError = RealtimeError::ChannelClosed.into();
        assert!(matches!(err, MessagingError::Transport(_)));
    }
}
