use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use reverb_domain::{AutoReplyRule, RateLimit, ReplyLog, ReplyMessage};

#[async_trait]
/// Trait contract for `RuleStore` behavior: the active rule snapshot for an
/// account, enabled rules only, in evaluation order (priority desc, created
/// desc). Fetched once per webhook batch.
pub trait RuleStore: Send + Sync {
    async fn find_active_by_account_id(&self, account_id: &str) -> Result<Vec<AutoReplyRule>>;
}

#[async_trait]
/// Trait contract for `ReplyLogStore` behavior. Saves are dispatched
/// fire-and-forget by the engine; implementations must tolerate concurrent
/// appends.
pub trait ReplyLogStore: Send + Sync {
    async fn save(&self, log: ReplyLog) -> Result<()>;
}

#[async_trait]
/// Trait contract for `RateLimiter` behavior. `check` is read-only and never
/// consumes budget; `increment` consumes one unit. The split exists so budget
/// is spent only for replies that were actually delivered.
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str, limit: &RateLimit) -> Result<bool>;
    async fn increment(&self, key: &str, limit: &RateLimit) -> Result<()>;
}

#[async_trait]
/// Trait contract for `ReplyGateway` behavior: deliver messages to the
/// platform against a reply token. Errors are terminal for the event; the
/// core never retries.
pub trait ReplyGateway: Send + Sync {
    async fn reply(&self, reply_token: &str, messages: &[ReplyMessage]) -> Result<()>;
}

/// One probability roll per candidate response. Injectable so tests pin the
/// outcome of weighted selection.
pub trait ResponseSampler: Send + Sync {
    fn roll(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
/// Default sampler: uniform draw from `[0, 1)`.
pub struct ThreadRngSampler;

impl ResponseSampler for ThreadRngSampler {
    fn roll(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_thread_rng_sampler_stays_in_unit_interval() {
        let sampler = ThreadRngSampler;
        for _ in 0..64 {
            let roll = sampler.roll();
            assert!((0.0..1.0).contains(&roll));
        }
    }
}
