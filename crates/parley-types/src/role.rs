//! Customer roles and the staff capability predicate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to every customer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A shopper; originates support conversations.
    Customer,
    /// Support staff with moderation rights.
    Moderator,
    /// Store administrator.
    Admin,
    /// Administrator with full control.
    SuperAdmin,
}

impl Role {
    /// Returns true for ADMIN, MODERATOR and SUPER_ADMIN.
    ///
    /// This is the single staff check used by the router, the gateway and
    /// the HTTP boundary.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin | Role::SuperAdmin)
    }

    /// Parse from the wire spelling (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Some(Role::Customer),
            "MODERATOR" => Some(Role::Moderator),
            "ADMIN" => Some(Role::Admin),
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// All roles.
    pub fn all() -> [Role; 4] {
        [Role::Customer, Role::Moderator, Role::Admin, Role::SuperAdmin]
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "CUSTOMER"),
            Role::Moderator => write!(f, "MODERATOR"),
            Role::Admin => write!(f, "ADMIN"),
            Role::SuperAdmin => write!(f, "SUPER_ADMIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_staff() {
        assert!(!Role::Customer.is_staff());
        assert!(Role::Moderator.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(Role::SuperAdmin.is_staff());
    }

    #[test]
    fn test_parse_and_display_agree() {
        for role in Role::all() {
            assert_eq!(Role::parse(&role.to_string()), Some(role));
        }
        assert_eq!(Role::parse("super_admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_serde_spelling() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let role: Role = serde_json::from_str("\"MODERATOR\"").unwrap();
        assert_eq!(role, Role::Moderator);
    }
}
