//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur while reading or writing support data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Customer not found.
    #[error("customer not found: {id}")]
    CustomerNotFound { id: String },

    /// Conversation not found.
    #[error("conversation not found: {id}")]
    ConversationNotFound { id: String },

    /// Chat room not found.
    #[error("chat room not found: {id}")]
    ChatRoomNotFound { id: String },

    /// The actor's role does not allow the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl StoreError {
    /// Returns true for the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CustomerNotFound { .. }
                | StoreError::ConversationNotFound { .. }
                | StoreError::ChatRoomNotFound { .. }
        )
    }
}
