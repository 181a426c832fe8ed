use serde::{Deserialize, Serialize};

use super::message::Message;
use super::presence::{PresenceSnapshot, PresenceState};
use super::typing::TypingSignal;

/// Realtime events sent from server to client.
///
/// Every inbound frame is validated into this closed set at the transport
/// boundary; handlers never see loosely-shaped JSON.
///
/// # JSON Wire Format
///
/// ```json
/// {"event": "messages:new", "data": {"id": "m1", "senderId": "7", ...}}
/// {"event": "messages:typing", "data": {"fromUserId": "7", "isTyping": true}}
/// {"event": "presence:snapshot", "data": [{"userId": "7", "online": true, "lastSeenAt": null}]}
/// {"event": "presence:update", "data": {"userId": "7", "online": false, "lastSeenAt": "2026-01-01T00:00:00Z"}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A new message addressed to the authenticated user.
    #[serde(rename = "messages:new")]
    NewMessage(Message),

    /// Another user started or stopped typing to the authenticated user.
    #[serde(rename = "messages:typing")]
    Typing(TypingSignal),

    /// Full replacement presence set for the current watch list.
    #[serde(rename = "presence:snapshot")]
    PresenceSnapshot(PresenceSnapshot),

    /// Incremental single-user presence delta.
    #[serde(rename = "presence:update")]
    PresenceUpdate(PresenceState),
}
