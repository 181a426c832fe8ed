use serde::{Deserialize, Serialize};

/// Transient typing-indicator notification.
///
/// Not persisted; delivered at most once per emission with no ordering
/// guarantee relative to message delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    /// User whose typing state changed.
    pub from_user_id: String,

    /// `true` while the user is typing, `false` when they stop.
    pub is_typing: bool,
}
