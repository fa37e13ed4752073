use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::condition::{validate_condition, Condition};
use crate::message::IncomingMessage;
use crate::rate_limit::{validate_rate_limit, RateLimit};
use crate::response::{validate_response, Response};
use crate::time_window::{validate_time_window, TimeWindow};

pub const MAX_RULE_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One prioritized, conditionally gated reply instruction. Immutable once
/// constructed; the engine only ever sees a point-in-time snapshot.
pub struct AutoReplyRule {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub priority: u32,
    pub conditions: Vec<Condition>,
    pub responses: Vec<Response>,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub created_unix_ms: u64,
    #[serde(default)]
    pub updated_unix_ms: u64,
}

fn default_enabled() -> bool {
    true
}

impl AutoReplyRule {
    /// A rule matches when it is enabled and EVERY condition matches the
    /// message. Rate limit and time window are policy gates applied by the
    /// engine after a match, not part of matching.
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        if !self.enabled || self.conditions.is_empty() {
            return false;
        }
        self.conditions
            .iter()
            .all(|condition| condition.matches(message))
    }
}

/// Evaluation order: priority descending, then created_unix_ms descending
/// (newest first), then id for a stable total order.
pub fn sort_rules_for_evaluation(rules: &mut [AutoReplyRule]) {
    rules.sort_by(|left, right| {
        right
            .priority
            .cmp(&left.priority)
            .then_with(|| right.created_unix_ms.cmp(&left.created_unix_ms))
            .then_with(|| left.id.cmp(&right.id))
    });
}

pub fn validate_rule(rule: &AutoReplyRule) -> Result<()> {
    if rule.id.trim().is_empty() {
        bail!("rule id must not be empty");
    }
    let label = format!("rule '{}'", rule.id);
    if rule.account_id.trim().is_empty() {
        bail!("{label} has an empty account_id");
    }
    let name = rule.name.trim();
    if name.is_empty() {
        bail!("{label} has an empty name");
    }
    if name.chars().count() > MAX_RULE_NAME_CHARS {
        bail!("{label} name exceeds {} characters", MAX_RULE_NAME_CHARS);
    }
    if rule.conditions.is_empty() {
        bail!("{label} must declare at least one condition");
    }
    if rule.responses.is_empty() {
        bail!("{label} must declare at least one response");
    }
    for condition in &rule.conditions {
        validate_condition(condition, &label)?;
    }
    for response in &rule.responses {
        validate_response(response, &label)?;
    }
    if let Some(rate_limit) = &rule.rate_limit {
        validate_rate_limit(rate_limit, &label)?;
    }
    if let Some(time_window) = &rule.time_window {
        validate_time_window(time_window, &label)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_keyword_rule(id: &str, priority: u32, keyword: &str) -> AutoReplyRule {
    use crate::condition::KeywordMatchMode;
    use crate::response::ResponsePayload;

    AutoReplyRule {
        id: id.to_string(),
        account_id: "acct-1".to_string(),
        name: format!("keyword rule {id}"),
        priority,
        conditions: vec![Condition::Keyword {
            keywords: vec![keyword.to_string()],
            mode: KeywordMatchMode::Partial,
        }],
        responses: vec![Response {
            payload: ResponsePayload::Text {
                text: format!("reply from {id}"),
            },
            probability: 1.0,
        }],
        rate_limit: None,
        time_window: None,
        enabled: true,
        created_unix_ms: 1_700_000_000_000,
        updated_unix_ms: 1_700_000_000_000,
    }
}
