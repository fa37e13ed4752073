use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ReplyStatus` values.
pub enum ReplyStatus {
    Success,
    Failed,
    RateLimited,
    TimeWindowBlocked,
}

impl ReplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::RateLimited => "rate_limited",
            Self::TimeWindowBlocked => "time_window_blocked",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Immutable audit record: one per processed inbound event outcome.
pub struct ReplyLog {
    pub id: String,
    #[serde(default)]
    pub rule_id: Option<String>,
    pub account_id: String,
    pub user_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    pub message_id: String,
    #[serde(default)]
    pub matched_text: Option<String>,
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub response_content: Option<String>,
    pub status: ReplyStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub latency_ms: u64,
    pub timestamp_unix_ms: u64,
}

impl ReplyLog {
    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }

    /// Policy blocks (rate limited or outside the time window), as opposed to
    /// delivery failures.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self.status,
            ReplyStatus::RateLimited | ReplyStatus::TimeWindowBlocked
        )
    }

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

pub fn validate_reply_log(log: &ReplyLog) -> Result<()> {
    if log.id.trim().is_empty() {
        bail!("reply log id must not be empty");
    }
    if log.account_id.trim().is_empty() {
        bail!("reply log '{}' has an empty account_id", log.id);
    }
    if log.user_id.trim().is_empty() {
        bail!("reply log '{}' has an empty user_id", log.id);
    }
    if log.message_id.trim().is_empty() {
        bail!("reply log '{}' has an empty message_id", log.id);
    }
    if log.status == ReplyStatus::Success {
        if log.error.is_some() {
            bail!("reply log '{}' is success but carries an error", log.id);
        }
        if log.response_type.is_none() {
            bail!("reply log '{}' is success but has no response_type", log.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log(status: ReplyStatus) -> ReplyLog {
        ReplyLog {
            id: "log-1".to_string(),
            rule_id: Some("r-1".to_string()),
            account_id: "acct-1".to_string(),
            user_id: "user-1".to_string(),
            group_id: None,
            room_id: None,
            message_id: "msg-1".to_string(),
            matched_text: Some("help".to_string()),
            response_type: Some("text".to_string()),
            response_content: Some("reply text".to_string()),
            status,
            error: None,
            latency_ms: 12,
            timestamp_unix_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn unit_is_blocked_covers_both_policy_statuses() {
        assert!(sample_log(ReplyStatus::RateLimited).is_blocked());
        assert!(sample_log(ReplyStatus::TimeWindowBlocked).is_blocked());
        assert!(!sample_log(ReplyStatus::Success).is_blocked());
        assert!(!sample_log(ReplyStatus::Failed).is_blocked());
    }

    #[test]
    fn unit_validate_reply_log_enforces_success_invariants() {
        let mut log = sample_log(ReplyStatus::Success);
        log.error = Some("boom".to_string());
        let error = validate_reply_log(&log).expect_err("should fail");
        assert!(error.to_string().contains("carries an error"));

        let mut log = sample_log(ReplyStatus::Success);
        log.response_type = None;
        let error = validate_reply_log(&log).expect_err("should fail");
        assert!(error.to_string().contains("no response_type"));
    }

    #[test]
    fn functional_reply_log_round_trips_field_for_field() {
        let mut log = sample_log(ReplyStatus::Failed);
        log.error = Some("platform returned 500".to_string());
        log.group_id = Some("group-2".to_string());
        let encoded = serde_json::to_string(&log).expect("encode");
        let decoded = serde_json::from_str::<ReplyLog>(&encoded).expect("decode");
        assert_eq!(log, decoded);
    }

    #[test]
    fn unit_status_serializes_as_snake_case() {
        let encoded =
            serde_json::to_value(sample_log(ReplyStatus::TimeWindowBlocked)).expect("encode");
        assert_eq!(encoded["status"], "time_window_blocked");
    }
}
