//! Decision core of the Reverb auto-reply system.
//!
//! Turns one inbound message plus an account's rule snapshot into at most one
//! outbound reply, enforcing per-rule rate limits and time windows and logging
//! every outcome. The webhook processor fans event batches out to the engine
//! with per-event failure isolation.

pub mod contracts;
pub mod engine;
pub mod processor;
pub mod rate_limiter;

pub use contracts::{
    RateLimiter, ReplyGateway, ReplyLogStore, ResponseSampler, RuleStore, ThreadRngSampler,
};
pub use engine::{EngineOutcome, RuleEngine};
pub use processor::{render_webhook_batch_report, WebhookBatchReport, WebhookProcessor};
pub use rate_limiter::SlidingWindowRateLimiter;
