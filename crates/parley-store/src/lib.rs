//! Persistence gateway for Parley.
//!
//! The store owns no business logic beyond CRUD and the shaping of
//! read models (conversation + latest message + message count). Access
//! rules that depend only on stored data, such as "only customers may
//! originate conversations", are enforced here so every caller sees the
//! same answer.

mod error;
mod store;

pub use error::StoreError;
pub use store::{ConversationScope, CreatedMessage, NewCustomer, NewMessage, SupportStore};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
