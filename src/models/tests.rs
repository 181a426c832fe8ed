//! Wire-format tests for the realtime event envelopes.

use super::*;
use chrono::{TimeZone, Utc};
use serde_json::json;

fn sample_message() -> Message {
    Message {
        id: "m1".to_string(),
        sender_id: "7".to_string(),
        recipient_id: "3".to_string(),
        content: "hello".to_string(),
        read_at: None,
        created_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap(),
    }
}

#[test]
fn new_message_event_parses_from_wire() {
    let raw = json!({
        "event": "messages:new",
        "data": {
            "id": "m1",
            "senderId": "7",
            "recipientId": "3",
            "content": "hello",
            "readAt": null,
            "createdAt": "2026-01-15T09:30:00Z",
            "updatedAt": "2026-01-15T09:30:00Z"
        }
    });

    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(event, ServerEvent::NewMessage(sample_message()));
}

#[test]
fn message_uses_camel_case_field_names() {
    let value = serde_json::to_value(sample_message()).unwrap();
    let obj = value.as_object().unwrap();
    assert!(obj.contains_key("senderId"));
    assert!(obj.contains_key("recipientId"));
    assert!(obj.contains_key("readAt"));
    assert!(obj.contains_key("createdAt"));
    assert!(!obj.contains_key("sender_id"));
}

#[test]
fn message_read_state() {
    let mut msg = sample_message();
    assert!(!msg.is_read());
    msg.read_at = Some(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
    assert!(msg.is_read());
}

#[test]
fn typing_event_parses_from_wire() {
    let raw = json!({
        "event": "messages:typing",
        "data": {"fromUserId": "7", "isTyping": true}
    });

    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(
        event,
        ServerEvent::Typing(TypingSignal {
            from_user_id: "7".to_string(),
            is_typing: true,
        })
    );
}

#[test]
fn presence_snapshot_is_a_plain_array_on_the_wire() {
    let raw = json!({
        "event": "presence:snapshot",
        "data": [
            {"userId": "3", "online": true, "lastSeenAt": null},
            {"userId": "7", "online": false, "lastSeenAt": "2026-01-15T09:00:00Z"}
        ]
    });

    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    let ServerEvent::PresenceSnapshot(snapshot) = event else {
        panic!("expected a presence snapshot");
    };
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.get("3").unwrap().online);
    assert!(!snapshot.get("7").unwrap().online);
    assert!(snapshot.get("7").unwrap().last_seen_at.is_some());
    assert!(snapshot.get("9").is_none());
}

#[test]
fn presence_update_is_a_single_delta() {
    let raw = json!({
        "event": "presence:update",
        "data": {"userId": "7", "online": true, "lastSeenAt": null}
    });

    let event: ServerEvent = serde_json::from_value(raw).unwrap();
    assert_eq!(
        event,
        ServerEvent::PresenceUpdate(PresenceState {
            user_id: "7".to_string(),
            online: true,
            last_seen_at: None,
        })
    );
}

#[test]
fn unknown_event_name_is_rejected() {
    let raw = json!({"event": "messages:edited", "data": {}});
    assert!(serde_json::from_value::<ServerEvent>(raw).is_err());
}

#[test]
fn typing_emission_wire_shape() {
    let event = ClientEvent::Typing {
        to_user_id: "3".to_string(),
        is_typing: true,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        json!({"event": "messages:typing", "data": {"toUserId": "3", "isTyping": true}})
    );
}

#[test]
fn watch_emission_wire_shape() {
    let event = ClientEvent::WatchPresence {
        user_ids: vec!["3".to_string(), "7".to_string()],
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        json!({"event": "presence:watch", "data": {"userIds": ["3", "7"]}})
    );
}
