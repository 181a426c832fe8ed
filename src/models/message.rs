use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message between two users.
///
/// Produced server-side; the client only receives and forwards it to
/// handlers, never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned message identifier.
    pub id: String,

    /// User who sent the message.
    pub sender_id: String,

    /// User the message was addressed to.
    pub recipient_id: String,

    /// Message body.
    pub content: String,

    /// When the recipient read the message, if they have.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,

    /// Server-side creation time.
    pub created_at: DateTime<Utc>,

    /// Server-side last-modification time.
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// `true` when the recipient has read the message.
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}
