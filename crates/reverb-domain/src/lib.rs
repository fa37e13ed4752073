//! Domain model for the Reverb auto-reply engine.
//!
//! Defines the inbound message shape, rule trigger conditions, weighted
//! response payloads, policy value objects (rate limit, time window), the
//! immutable reply audit record, and the schema-versioned rules document
//! consumed by rule stores. All wire-facing types are closed tagged enums
//! validated at the repository boundary.

pub mod condition;
pub mod message;
pub mod rate_limit;
pub mod reply_log;
pub mod response;
pub mod rule;
pub mod rules_doc;
pub mod time_window;
pub mod webhook;

pub use condition::{validate_condition, Condition, KeywordMatchMode};
pub use message::{EventKind, IncomingMessage};
pub use rate_limit::{validate_rate_limit, RateLimit, RateLimitScope};
pub use reply_log::{validate_reply_log, ReplyLog, ReplyStatus};
pub use response::{validate_response, ReplyMessage, Response, ResponsePayload};
pub use rule::{sort_rules_for_evaluation, validate_rule, AutoReplyRule};
pub use rules_doc::{
    load_rules_document, parse_rules_document, validate_rules_document, RulesDocument,
    RULES_DOCUMENT_SCHEMA_VERSION,
};
pub use time_window::{validate_time_window, DayOfWeek, TimeWindow};
pub use webhook::{decode_webhook_event, dispatchable_event_kind};
