//! Persisted pseudo-identity for unauthenticated visitors.

use crate::error::RealtimeError;
use rand::{distributions::Alphanumeric, Rng};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of every generated guest id.
pub const GUEST_PREFIX: &str = "guest_";

const GUEST_SUFFIX_LENGTH: usize = 12;

/// A locally generated id standing in for a customer id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestIdentity {
    id: String,
    path: PathBuf,
}

impl GuestIdentity {
    /// Load the id stored at `path`, generating and persisting one if the
    /// file is missing or holds no valid id.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, RealtimeError> {
        let path = path.as_ref().to_path_buf();

        if let Ok(stored) = fs::read_to_string(&path) {
            let stored = stored.trim();
            if is_guest_id(stored) {
                return Ok(Self {
                    id: stored.to_string(),
                    path,
                });
            }
        }

        let id = generate_guest_id();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &id)?;
        debug!(guest_id = %id, path = %path.display(), "Guest identity created");

        Ok(Self { id, path })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forget the identity (logout); the next load creates a new one.
    pub fn forget(self) -> Result<(), RealtimeError> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Whether `s` looks like a generated guest id.
pub fn is_guest_id(s: &str) -> bool {
    s.strip_prefix(GUEST_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn generate_guest_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GUEST_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", GUEST_PREFIX, suffix.to_lowercase())
}
