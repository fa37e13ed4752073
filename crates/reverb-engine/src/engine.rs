use std::sync::Arc;

use anyhow::Result;
use reverb_core::{current_unix_timestamp_ms, saturating_elapsed_ms, short_hash};
use reverb_domain::{
    AutoReplyRule, IncomingMessage, ReplyLog, ReplyStatus, Response,
};

use crate::contracts::{RateLimiter, ReplyGateway, ReplyLogStore, ResponseSampler};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `EngineOutcome` values for one evaluated event.
pub enum EngineOutcome {
    Replied { rule_id: String },
    NoMatch,
    RateLimited { rule_id: String },
    TimeWindowBlocked { rule_id: String },
    DeliveryFailed { rule_id: String, detail: String },
}

impl EngineOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replied { .. } => "replied",
            Self::NoMatch => "no_match",
            Self::RateLimited { .. } => "rate_limited",
            Self::TimeWindowBlocked { .. } => "time_window_blocked",
            Self::DeliveryFailed { .. } => "delivery_failed",
        }
    }

    pub fn is_replied(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }
}

#[derive(Clone)]
/// Evaluates one inbound message against an account's rule snapshot and
/// produces at most one outbound reply. All collaborators are injected; the
/// engine owns no global state.
pub struct RuleEngine {
    rate_limiter: Arc<dyn RateLimiter>,
    reply_logs: Arc<dyn ReplyLogStore>,
    gateway: Arc<dyn ReplyGateway>,
    sampler: Arc<dyn ResponseSampler>,
}

impl RuleEngine {
    pub fn new(
        rate_limiter: Arc<dyn RateLimiter>,
        reply_logs: Arc<dyn ReplyLogStore>,
        gateway: Arc<dyn ReplyGateway>,
        sampler: Arc<dyn ResponseSampler>,
    ) -> Self {
        Self {
            rate_limiter,
            reply_logs,
            gateway,
            sampler,
        }
    }

    /// Walks the rule snapshot in its given order and stops at the first rule
    /// whose conditions match, except when weighted selection yields no
    /// response (the one case that falls through to lower-priority rules).
    /// A policy block (rate limit, time window) or a delivery failure ends
    /// evaluation for the event without trying further rules.
    ///
    /// `now_unix_ms` is the evaluation instant used for time-window checks
    /// and log timestamps; it is passed in so tests can pin it.
    pub async fn evaluate(
        &self,
        account_id: &str,
        message: &IncomingMessage,
        rules: &[AutoReplyRule],
        now_unix_ms: u64,
    ) -> Result<EngineOutcome> {
        let started_unix_ms = current_unix_timestamp_ms();

        for rule in rules {
            if !rule.matches(message) {
                continue;
            }

            if let Some(limit) = &rule.rate_limit {
                let key = limit.key_for(&rule.id, message);
                let allowed = match self.rate_limiter.check(&key, limit).await {
                    Ok(allowed) => allowed,
                    Err(error) => {
                        // Fail open: availability over strict fairness.
                        tracing::warn!(
                            key = key.as_str(),
                            rule_id = rule.id.as_str(),
                            error = %format!("{error:#}"),
                            "rate limiter check failed, allowing reply"
                        );
                        true
                    }
                };
                if !allowed {
                    self.dispatch_log(
                        account_id,
                        message,
                        rule,
                        None,
                        ReplyStatus::RateLimited,
                        None,
                        started_unix_ms,
                        now_unix_ms,
                    );
                    return Ok(EngineOutcome::RateLimited {
                        rule_id: rule.id.clone(),
                    });
                }
            }

            if let Some(window) = &rule.time_window {
                if !window.contains(now_unix_ms)? {
                    self.dispatch_log(
                        account_id,
                        message,
                        rule,
                        None,
                        ReplyStatus::TimeWindowBlocked,
                        None,
                        started_unix_ms,
                        now_unix_ms,
                    );
                    return Ok(EngineOutcome::TimeWindowBlocked {
                        rule_id: rule.id.clone(),
                    });
                }
            }

            let Some(response) = self.select_response(rule) else {
                continue;
            };

            let reply_message = response.to_reply_message();
            match self
                .gateway
                .reply(&message.reply_token, std::slice::from_ref(&reply_message))
                .await
            {
                Ok(()) => {
                    if let Some(limit) = &rule.rate_limit {
                        let key = limit.key_for(&rule.id, message);
                        if let Err(error) = self.rate_limiter.increment(&key, limit).await {
                            tracing::warn!(
                                key = key.as_str(),
                                rule_id = rule.id.as_str(),
                                error = %format!("{error:#}"),
                                "rate limiter increment failed"
                            );
                        }
                    }
                    self.dispatch_log(
                        account_id,
                        message,
                        rule,
                        Some(response),
                        ReplyStatus::Success,
                        None,
                        started_unix_ms,
                        now_unix_ms,
                    );
                    return Ok(EngineOutcome::Replied {
                        rule_id: rule.id.clone(),
                    });
                }
                Err(error) => {
                    let detail = format!("{error:#}");
                    self.dispatch_log(
                        account_id,
                        message,
                        rule,
                        Some(response),
                        ReplyStatus::Failed,
                        Some(detail.clone()),
                        started_unix_ms,
                        now_unix_ms,
                    );
                    return Ok(EngineOutcome::DeliveryFailed {
                        rule_id: rule.id.clone(),
                        detail,
                    });
                }
            }
        }

        Ok(EngineOutcome::NoMatch)
    }

    fn select_response<'a>(&self, rule: &'a AutoReplyRule) -> Option<&'a Response> {
        rule.responses
            .iter()
            .find(|response| self.sampler.roll() < response.probability)
    }

    /// Fire-and-forget: the save is dispatched on a background task and its
    /// failure only reaches the operational log, never the reply path.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_log(
        &self,
        account_id: &str,
        message: &IncomingMessage,
        rule: &AutoReplyRule,
        response: Option<&Response>,
        status: ReplyStatus,
        error: Option<String>,
        started_unix_ms: u64,
        now_unix_ms: u64,
    ) {
        let log = ReplyLog {
            id: format!(
                "log-{}-{}",
                now_unix_ms,
                short_hash(format!("{}:{}", message.id, rule.id).as_bytes())
            ),
            rule_id: Some(rule.id.clone()),
            account_id: account_id.to_string(),
            user_id: message.user_id.clone(),
            group_id: message.group_id.clone(),
            room_id: message.room_id.clone(),
            message_id: message.id.clone(),
            matched_text: message.text.clone(),
            response_type: response.map(|value| value.response_type().to_string()),
            response_content: response.map(Response::summary),
            status,
            error,
            latency_ms: saturating_elapsed_ms(started_unix_ms, current_unix_timestamp_ms()),
            timestamp_unix_ms: now_unix_ms,
        };

        let store = Arc::clone(&self.reply_logs);
        tokio::spawn(async move {
            let log_id = log.id.clone();
            if let Err(error) = store.save(log).await {
                tracing::warn!(
                    log_id = log_id.as_str(),
                    error = %format!("{error:#}"),
                    "reply log save failed"
                );
            }
        });
    }
}
