use anyhow::Result;
use async_trait::async_trait;
use reverb_domain::{sort_rules_for_evaluation, AutoReplyRule, ReplyLog};
use reverb_engine::{ReplyLogStore, RuleStore};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
/// In-memory rule store for tests and embedders that assemble rules in code.
pub struct MemoryRuleStore {
    rules: Vec<AutoReplyRule>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<AutoReplyRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_active_by_account_id(&self, account_id: &str) -> Result<Vec<AutoReplyRule>> {
        let mut rules = self
            .rules
            .iter()
            .filter(|rule| rule.enabled && rule.account_id == account_id)
            .cloned()
            .collect::<Vec<_>>();
        sort_rules_for_evaluation(&mut rules);
        Ok(rules)
    }
}

#[derive(Debug, Default)]
/// In-memory reply log store; `snapshot` exposes saved records to assertions.
pub struct MemoryReplyLogStore {
    logs: Mutex<Vec<ReplyLog>>,
}

impl MemoryReplyLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<ReplyLog> {
        self.logs.lock().await.clone()
    }
}

#[async_trait]
impl ReplyLogStore for MemoryReplyLogStore {
    async fn save(&self, log: ReplyLog) -> Result<()> {
        self.logs.lock().await.push(log);
        Ok(())
    }
}
