use std::sync::Arc;

use anyhow::{Context, Result};
use reverb_core::current_unix_timestamp_ms;
use reverb_domain::{decode_webhook_event, dispatchable_event_kind};
use serde::Serialize;
use serde_json::Value;

use crate::contracts::RuleStore;
use crate::engine::RuleEngine;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
/// Aggregated result of one webhook batch. `processed_count` counts the
/// dispatchable (`message` / `follow`) events seen; `errors` carries one
/// entry per event that failed to decode or evaluate.
pub struct WebhookBatchReport {
    pub processed_count: usize,
    pub replied_count: usize,
    pub errors: Vec<String>,
}

pub fn render_webhook_batch_report(report: &WebhookBatchReport) -> String {
    format!(
        "webhook batch: processed_count={} replied_count={} error_count={}",
        report.processed_count,
        report.replied_count,
        report.errors.len()
    )
}

/// Fans one webhook batch out to the rule engine, sequentially in event
/// order. The active rule snapshot is fetched once per batch; one event's
/// failure never stops the rest.
pub struct WebhookProcessor {
    rule_store: Arc<dyn RuleStore>,
    engine: RuleEngine,
}

impl WebhookProcessor {
    pub fn new(rule_store: Arc<dyn RuleStore>, engine: RuleEngine) -> Self {
        Self { rule_store, engine }
    }

    pub async fn process(&self, account_id: &str, events: &[Value]) -> Result<WebhookBatchReport> {
        let rules = self
            .rule_store
            .find_active_by_account_id(account_id)
            .await
            .context("failed to load active rules")?;

        let mut report = WebhookBatchReport::default();
        for event in events {
            if dispatchable_event_kind(event).is_none() {
                continue;
            }
            report.processed_count = report.processed_count.saturating_add(1);

            let message = match decode_webhook_event(event) {
                Ok(message) => message,
                Err(error) => {
                    report.errors.push(format!("event decode error: {error:#}"));
                    continue;
                }
            };

            match self
                .engine
                .evaluate(account_id, &message, &rules, current_unix_timestamp_ms())
                .await
            {
                Ok(outcome) => {
                    if outcome.is_replied() {
                        report.replied_count = report.replied_count.saturating_add(1);
                    }
                    tracing::debug!(
                        event_id = message.id.as_str(),
                        outcome = outcome.as_str(),
                        "webhook event evaluated"
                    );
                }
                Err(error) => {
                    report
                        .errors
                        .push(format!("event processing error: {error:#}"));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use reverb_domain::{
        AutoReplyRule, Condition, KeywordMatchMode, RateLimit, ReplyLog, ReplyMessage, Response,
        ResponsePayload,
    };
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::contracts::{
        RateLimiter, ReplyGateway, ReplyLogStore, ResponseSampler, RuleStore,
    };

    struct StaticRuleStore {
        rules: Vec<AutoReplyRule>,
    }

    #[async_trait]
    impl RuleStore for StaticRuleStore {
        async fn find_active_by_account_id(&self, _account_id: &str) -> Result<Vec<AutoReplyRule>> {
            Ok(self.rules.clone())
        }
    }

    struct FailingRuleStore;

    #[async_trait]
    impl RuleStore for FailingRuleStore {
        async fn find_active_by_account_id(&self, _account_id: &str) -> Result<Vec<AutoReplyRule>> {
            bail!("rule store unavailable")
        }
    }

    #[derive(Default)]
    struct CountingGateway {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ReplyGateway for CountingGateway {
        async fn reply(&self, _reply_token: &str, _messages: &[ReplyMessage]) -> Result<()> {
            *self.calls.lock().await += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct NullLogStore;

    #[async_trait]
    impl ReplyLogStore for NullLogStore {
        async fn save(&self, _log: ReplyLog) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct AlwaysAllowLimiter;

    #[async_trait]
    impl RateLimiter for AlwaysAllowLimiter {
        async fn check(&self, _key: &str, _limit: &RateLimit) -> Result<bool> {
            Ok(true)
        }

        async fn increment(&self, _key: &str, _limit: &RateLimit) -> Result<()> {
            Ok(())
        }
    }

    struct AlwaysFireSampler;

    impl ResponseSampler for AlwaysFireSampler {
        fn roll(&self) -> f64 {
            0.0
        }
    }

    fn keyword_rule(keyword: &str) -> AutoReplyRule {
        AutoReplyRule {
            id: format!("r-{keyword}"),
            account_id: "acct-1".to_string(),
            name: format!("rule {keyword}"),
            priority: 5,
            conditions: vec![Condition::Keyword {
                keywords: vec![keyword.to_string()],
                mode: KeywordMatchMode::Partial,
            }],
            responses: vec![Response {
                payload: ResponsePayload::Text {
                    text: "hello".to_string(),
                },
                probability: 1.0,
            }],
            rate_limit: None,
            time_window: None,
            enabled: true,
            created_unix_ms: 1,
            updated_unix_ms: 1,
        }
    }

    fn follow_rule() -> AutoReplyRule {
        let mut rule = keyword_rule("follow");
        rule.id = "r-follow".to_string();
        rule.conditions = vec![Condition::Follow];
        rule
    }

    fn processor_with(
        rules: Vec<AutoReplyRule>,
        gateway: Arc<CountingGateway>,
    ) -> WebhookProcessor {
        let engine = RuleEngine::new(
            Arc::new(AlwaysAllowLimiter),
            Arc::new(NullLogStore),
            gateway,
            Arc::new(AlwaysFireSampler),
        );
        WebhookProcessor::new(Arc::new(StaticRuleStore { rules }), engine)
    }

    fn message_event(id: &str, text: &str) -> Value {
        json!({
            "type": "message",
            "message": {"id": id, "type": "text", "text": text},
            "source": {"type": "user", "userId": "user-1"},
            "replyToken": format!("token-{id}"),
            "timestamp": 1_700_000_000_000u64
        })
    }

    #[tokio::test]
    async fn functional_batch_with_one_malformed_event_still_processes_the_rest() {
        let gateway = Arc::new(CountingGateway::default());
        let processor = processor_with(vec![keyword_rule("help")], Arc::clone(&gateway));
        let events = vec![
            message_event("m-1", "help"),
            // Malformed: message events must carry a replyToken.
            json!({
                "type": "message",
                "message": {"id": "m-2", "type": "text", "text": "help"},
                "source": {"type": "user", "userId": "user-1"},
                "timestamp": 1_700_000_000_000u64
            }),
            message_event("m-3", "help"),
        ];

        let report = processor.process("acct-1", &events).await.expect("process");
        assert_eq!(report.processed_count, 3);
        assert_eq!(report.replied_count, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("decode error"));
        assert_eq!(*gateway.calls.lock().await, 2);
    }

    #[tokio::test]
    async fn functional_non_dispatchable_events_are_skipped_uncounted() {
        let gateway = Arc::new(CountingGateway::default());
        let processor = processor_with(vec![keyword_rule("help")], Arc::clone(&gateway));
        let events = vec![
            json!({"type": "unfollow", "source": {"userId": "user-1"}}),
            message_event("m-1", "help"),
        ];

        let report = processor.process("acct-1", &events).await.expect("process");
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.replied_count, 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn functional_follow_events_are_dispatched_to_follow_rules() {
        let gateway = Arc::new(CountingGateway::default());
        let processor = processor_with(vec![follow_rule()], Arc::clone(&gateway));
        let events = vec![json!({
            "type": "follow",
            "webhookEventId": "evt-1",
            "source": {"type": "user", "userId": "user-9"},
            "replyToken": "token-f",
            "timestamp": 1_700_000_000_000u64
        })];

        let report = processor.process("acct-1", &events).await.expect("process");
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.replied_count, 1);
        assert_eq!(*gateway.calls.lock().await, 1);
    }

    #[tokio::test]
    async fn unit_rule_store_failure_fails_the_whole_batch() {
        let engine = RuleEngine::new(
            Arc::new(AlwaysAllowLimiter),
            Arc::new(NullLogStore),
            Arc::new(CountingGateway::default()),
            Arc::new(AlwaysFireSampler),
        );
        let processor = WebhookProcessor::new(Arc::new(FailingRuleStore), engine);
        let error = processor
            .process("acct-1", &[message_event("m-1", "help")])
            .await
            .expect_err("should fail");
        assert!(format!("{error:#}").contains("failed to load active rules"));
    }

    #[test]
    fn unit_render_webhook_batch_report_is_single_line() {
        let report = WebhookBatchReport {
            processed_count: 3,
            replied_count: 2,
            errors: vec!["event decode error: boom".to_string()],
        };
        assert_eq!(
            render_webhook_batch_report(&report),
            "webhook batch: processed_count=3 replied_count=2 error_count=1"
        );
    }
}
