use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `EventKind` values.
pub enum EventKind {
    Message,
    Follow,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Follow => "follow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One inbound chat event, built fresh per webhook event and never persisted.
pub struct IncomingMessage {
    pub id: String,
    pub event_kind: EventKind,
    pub text: Option<String>,
    pub user_id: String,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
    pub reply_token: String,
    pub timestamp_unix_ms: u64,
}

impl IncomingMessage {
    pub fn has_text(&self) -> bool {
        self.text
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Conversation identity: group wins over room, room wins over user.
    pub fn conversation_key(&self) -> String {
        if let Some(group_id) = self.group_id.as_deref().filter(|value| !value.is_empty()) {
            return format!("group:{group_id}");
        }
        if let Some(room_id) = self.room_id.as_deref().filter(|value| !value.is_empty()) {
            return format!("room:{room_id}");
        }
        format!("user:{}", self.user_id)
    }
}

#[cfg(test)]
pub(crate) fn sample_text_message(text: &str) -> IncomingMessage {
    IncomingMessage {
        id: "msg-1".to_string(),
        event_kind: EventKind::Message,
        text: Some(text.to_string()),
        user_id: "user-1".to_string(),
        group_id: None,
        room_id: None,
        reply_token: "reply-token-1".to_string(),
        timestamp_unix_ms: 1_700_000_000_000,
    }
}
