//! Time-boxed capability grants.
//!
//! A grant maps topic patterns to the operations a client may perform on
//! them. Patterns are either a concrete topic (`conversation:c1`) or a
//! prefix wildcard (`conversation:*`). Grants are issued per identity and
//! presented as an opaque token when a realtime connection is opened.

use crate::topic::Topic;
use parking_lot::RwLock;
use parley_types::{ChatRoomId, ConversationId};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

/// Default grant lifetime.
pub const DEFAULT_GRANT_TTL: Duration = Duration::from_secs(60 * 60);

/// Length of generated grant tokens.
const TOKEN_LENGTH: usize = 40;

/// Operations a grant may allow on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Subscribe,
    Publish,
}

/// Topic pattern to allowed operations.
pub type Capability = BTreeMap<String, Vec<Operation>>;

/// Who a grant is being issued for, with the records that scope it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantSubject {
    /// Any staff role.
    Staff,
    /// A registered customer.
    Customer {
        conversations: Vec<ConversationId>,
        room: Option<ChatRoomId>,
    },
    /// An unregistered guest owning exactly one chat room.
    Guest { room: ChatRoomId },
}

impl GrantSubject {
    /// Build the capability table for this subject.
    pub fn capability(&self) -> Capability {
        use Operation::{Publish, Subscribe};

        let mut capability = Capability::new();
        match self {
            GrantSubject::Staff => {
                capability.insert(Topic::AdminBroadcast.to_string(), vec![Subscribe, Publish]);
                capability.insert(Topic::CustomerSupport.to_string(), vec![Subscribe, Publish]);
                capability.insert(Topic::all_conversations(), vec![Subscribe, Publish]);
                capability.insert(Topic::all_chat_rooms(), vec![Subscribe, Publish]);
            }
            GrantSubject::Customer {
                conversations,
                room,
            } => {
                capability.insert(Topic::CustomerSupport.to_string(), vec![Subscribe]);
                for id in conversations {
                    capability.insert(
                        Topic::Conversation(id.clone()).to_string(),
                        vec![Subscribe, Publish],
                    );
                }
                if let Some(room) = room {
                    capability.insert(
                        Topic::ChatRoom(room.clone()).to_string(),
                        vec![Subscribe, Publish],
                    );
                }
            }
            GrantSubject::Guest { room } => {
                capability.insert(
                    Topic::ChatRoom(room.clone()).to_string(),
                    vec![Subscribe, Publish],
                );
            }
        }
        capability
    }
}

/// A capability grant handed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityGrant {
    /// Opaque token presented when connecting.
    pub token: String,
    /// Identity the grant was issued to.
    pub client_id: String,
    /// Topic pattern to allowed operations.
    pub capability: Capability,
    /// Unix milliseconds.
    pub issued_at: u64,
    /// Unix milliseconds.
    pub expires_at: u64,
}

impl CapabilityGrant {
    /// Whether the grant allows `operation` on `topic`.
    pub fn allows(&self, topic: &Topic, operation: Operation) -> bool {
        let name = topic.to_string();
        self.capability.iter().any(|(pattern, ops)| {
            ops.contains(&operation) && pattern_matches(pattern, &name)
        })
    }

    /// Whether the grant has expired at `now` (unix milliseconds).
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

fn pattern_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => topic.starts_with(prefix) && topic.len() > prefix.len(),
        None => pattern == topic,
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Outstanding grants, indexed by token.
#[derive(Debug)]
pub struct GrantRegistry {
    grants: RwLock<HashMap<String, CapabilityGrant>>,
    ttl: Duration,
}

impl GrantRegistry {
    /// Create a registry issuing grants with the given lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Grant lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a grant for `client_id`.
    pub fn issue(&self, client_id: &str, capability: Capability) -> CapabilityGrant {
        let now = parley_types::now_millis();
        let grant = CapabilityGrant {
            token: generate_token(),
            client_id: client_id.to_string(),
            capability,
            issued_at: now,
            expires_at: now.saturating_add(self.ttl.as_millis() as u64),
        };

        let mut grants = self.grants.write();
        grants.retain(|_, g| !g.is_expired(now));
        grants.insert(grant.token.clone(), grant.clone());

        debug!(client_id = %client_id, topics = grant.capability.len(), "Grant issued");
        grant
    }

    /// Look up a live grant by token.
    pub fn lookup(&self, token: &str) -> Result<CapabilityGrant, crate::RealtimeError> {
        let grants = self.grants.read();
        let grant = grants.get(token).ok_or(crate::RealtimeError::InvalidToken)?;
        if grant.is_expired(parley_types::now_millis()) {
            return Err(crate::RealtimeError::GrantExpired);
        }
        Ok(grant.clone())
    }

    /// Add `pattern` with `operations` to every live grant of `client_id`.
    /// Returns the number of grants extended.
    pub fn extend_for_client(
        &self,
        client_id: &str,
        pattern: String,
        operations: Vec<Operation>,
    ) -> usize {
        let mut extended = 0;
        for grant in self.grants.write().values_mut() {
            if grant.client_id == client_id {
                grant.capability.insert(pattern.clone(), operations.clone());
                extended += 1;
            }
        }
        extended
    }

    /// Drop every grant of `client_id`.
    pub fn revoke_client(&self, client_id: &str) {
        self.grants.write().retain(|_, g| g.client_id != client_id);
    }

    /// Number of grants currently held.
    pub fn len(&self) -> usize {
        self.grants.read().len()
    }

    /// Whether no grants are held.
    pub fn is_empty(&self) -> bool {
        self.grants.read().is_empty()
    }
}

impl Default for GrantRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_GRANT_TTL)
    }
}
