use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::message::IncomingMessage;

pub const MAX_RATE_LIMIT_WINDOW_MINUTES: u32 = 1_440;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `RateLimitScope` values.
pub enum RateLimitScope {
    Global,
    User,
    Group,
    Room,
}

impl RateLimitScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::User => "user",
            Self::Group => "group",
            Self::Room => "room",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Per-rule reply budget: at most `count` replies per `window_minutes`.
pub struct RateLimit {
    pub count: u32,
    pub window_minutes: u32,
    pub scope: RateLimitScope,
}

impl RateLimit {
    pub fn window_ms(&self) -> u64 {
        u64::from(self.window_minutes).saturating_mul(60_000)
    }

    /// Counter key: scope plus conversation identity plus the rule id, so two
    /// rules never share a budget. Group/room scope degrades to the user key
    /// when the conversation lacks the corresponding identifier.
    pub fn key_for(&self, rule_id: &str, message: &IncomingMessage) -> String {
        match self.scope {
            RateLimitScope::Global => format!("rate:{rule_id}:global"),
            RateLimitScope::User => format!("rate:{rule_id}:user:{}", message.user_id),
            RateLimitScope::Group => match message
                .group_id
                .as_deref()
                .filter(|value| !value.is_empty())
            {
                Some(group_id) => format!("rate:{rule_id}:group:{group_id}"),
                None => format!("rate:{rule_id}:user:{}", message.user_id),
            },
            RateLimitScope::Room => match message
                .room_id
                .as_deref()
                .filter(|value| !value.is_empty())
            {
                Some(room_id) => format!("rate:{rule_id}:room:{room_id}"),
                None => format!("rate:{rule_id}:user:{}", message.user_id),
            },
        }
    }
}

pub fn validate_rate_limit(limit: &RateLimit, label: &str) -> Result<()> {
    if limit.count == 0 {
        bail!("{label} rate limit count must be greater than 0");
    }
    if limit.window_minutes == 0 {
        bail!("{label} rate limit window_minutes must be greater than 0");
    }
    if limit.window_minutes > MAX_RATE_LIMIT_WINDOW_MINUTES {
        bail!(
            "{label} rate limit window_minutes {} exceeds one day ({} minutes)",
            limit.window_minutes,
            MAX_RATE_LIMIT_WINDOW_MINUTES
        );
    }
    Ok(())
}
