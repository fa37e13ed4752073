//! Decoding of raw platform webhook events into `IncomingMessage` values.
//!
//! Events arrive as loosely-typed JSON and are decoded one at a time so a
//! malformed event never poisons the rest of its batch. Only `message` and
//! `follow` events are dispatchable; other kinds are skipped by the caller.

use anyhow::{anyhow, bail, Result};
use serde_json::{Map, Value};

use crate::message::{EventKind, IncomingMessage};

/// Returns the dispatchable kind of a raw webhook event, or `None` for event
/// kinds the engine does not handle (join, leave, unfollow, ...).
pub fn dispatchable_event_kind(event: &Value) -> Option<EventKind> {
    match event.get("type").and_then(Value::as_str).map(str::trim) {
        Some("message") => Some(EventKind::Message),
        Some("follow") => Some(EventKind::Follow),
        _ => None,
    }
}

/// Decodes one raw `message` or `follow` webhook event.
pub fn decode_webhook_event(event: &Value) -> Result<IncomingMessage> {
    let object = event
        .as_object()
        .ok_or_else(|| anyhow!("webhook event must be a JSON object"))?;
    let Some(event_kind) = dispatchable_event_kind(event) else {
        bail!(
            "webhook event type '{}' is not dispatchable",
            object
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
        );
    };

    let source = object_field(object, "source")?;
    let user_id = required_string_field(source, "userId", "webhook event source")?;
    let reply_token = object
        .get("replyToken")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("webhook event has no replyToken"))?
        .to_string();
    let timestamp_unix_ms = object
        .get("timestamp")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("webhook event has no numeric timestamp"))?;

    let (id, text) = match event_kind {
        EventKind::Message => {
            let message = object_field(object, "message")?;
            let id = required_string_field(message, "id", "webhook message")?;
            // Only text-type messages carry matchable text; stickers, images
            // and the rest decode with text = None.
            let text = match message.get("type").and_then(Value::as_str) {
                Some("text") => message
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            (id, text)
        }
        EventKind::Follow => {
            let id = optional_string_field(object, "webhookEventId")
                .ok_or_else(|| anyhow!("follow event has no webhookEventId"))?;
            (id, None)
        }
    };

    Ok(IncomingMessage {
        id,
        event_kind,
        text,
        user_id,
        group_id: optional_string_field(source, "groupId"),
        room_id: optional_string_field(source, "roomId"),
        reply_token,
        timestamp_unix_ms,
    })
}

fn object_field<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Map<String, Value>> {
    object
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| anyhow!("webhook event has no '{key}' object"))
}

fn required_string_field(object: &Map<String, Value>, key: &str, label: &str) -> Result<String> {
    optional_string_field(object, key).ok_or_else(|| anyhow!("{label} has no '{key}'"))
}

fn optional_string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
