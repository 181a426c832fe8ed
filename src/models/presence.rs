use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Online/offline state of a single watched user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    /// The watched user.
    pub user_id: String,

    /// `true` while the user has an active realtime session.
    pub online: bool,

    /// Last time the user was seen online, when known.
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Complete replacement set of presence state for the watched user list.
///
/// Delivered once after every `presence:watch` emission (including the
/// automatic re-watch after a reconnect); subsequent `presence:update`
/// events are single-user deltas against this snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct PresenceSnapshot {
    /// One entry per watched user.
    pub users: Vec<PresenceState>,
}

impl PresenceSnapshot {
    /// Look up the state of one user in the snapshot.
    pub fn get(&self, user_id: &str) -> Option<&PresenceState> {
        self.users.iter().find(|p| p.user_id == user_id)
    }

    /// Number of watched users in the snapshot.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// `true` when the snapshot covers no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
