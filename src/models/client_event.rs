use serde::{Deserialize, Serialize};

/// Realtime events sent from client to server.
///
/// Both emissions are fire-and-forget: no acknowledgement is awaited.
///
/// # JSON Wire Format
///
/// ```json
/// {"event": "messages:typing", "data": {"toUserId": "3", "isTyping": true}}
/// {"event": "presence:watch", "data": {"userIds": ["3", "7"]}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Notify the recipient that the authenticated user started or stopped
    /// typing.
    #[serde(rename = "messages:typing")]
    #[serde(rename_all = "camelCase")]
    Typing {
        to_user_id: String,
        is_typing: bool,
    },

    /// Replace the watched user set. The server answers with a
    /// `presence:snapshot` for exactly this set, then incremental
    /// `presence:update` deltas until the next watch or disconnect.
    #[serde(rename = "presence:watch")]
    #[serde(rename_all = "camelCase")]
    WatchPresence {
        /// Ordered, duplicate-free user-id set.
        user_ids: Vec<String>,
    },
}
