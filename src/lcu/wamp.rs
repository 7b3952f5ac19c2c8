//! WAMP 1 framing used by the client's event socket.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ClientEvent, EventType};

const SUBSCRIBE: u8 = 5;
const UNSUBSCRIBE: u8 = 6;
const EVENT: u8 = 8;

pub fn subscribe_frame(event: &str) -> String {
    json!([SUBSCRIBE, event]).to_string()
}

pub fn unsubscribe_frame(event: &str) -> String {
    json!([UNSUBSCRIBE, event]).to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    #[serde(default)]
    uri: String,
    event_type: EventType,
    #[serde(default)]
    data: Value,
}

/// Parses `[8, name, { uri, eventType, data }]`. Anything else yields `None`.
pub fn parse_event(text: &str) -> Option<ClientEvent> {
    let (opcode, name, payload): (u8, String, Value) = serde_json::from_str(text).ok()?;

    if opcode != EVENT {
        return None;
    }

    let payload: EventPayload = serde_json::from_value(payload).ok()?;

    Some(ClientEvent {
        name,
        uri: payload.uri,
        event_type: payload.event_type,
        data: payload.data,
    })
}
