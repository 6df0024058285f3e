//! Customer identities and their lightweight projection.

use serde::{Deserialize, Serialize};

use crate::Role;

/// Unique identifier for a customer.
pub type CustomerId = String;

/// A registered storefront identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier.
    pub id: CustomerId,
    /// Display name, if provided at registration.
    pub name: Option<String>,
    /// Email address (unique).
    pub email: String,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Role; immutable for the messaging core.
    pub role: Role,
    /// Unix milliseconds when registered.
    pub created_at: u64,
}

impl Customer {
    /// Name when present, otherwise the email address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Projection embedded in messages and conversation summaries.
    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            role: self.role,
        }
    }
}

/// Read-optimized customer projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

impl CustomerSummary {
    /// Projection for an unregistered guest identified only by a token.
    pub fn guest(guest_id: &str) -> Self {
        Self {
            id: guest_id.to_string(),
            name: Some("Guest".to_string()),
            email: format!("guest-{}@guest.local", guest_id),
            avatar: None,
            role: Role::Customer,
        }
    }
}
