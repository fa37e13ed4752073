//! File-backed and in-memory store implementations for the Reverb engine
//! contracts, plus operator tooling over the rules document (template,
//! validate, inspect).

pub mod file_rule_store;
pub mod memory;
pub mod ndjson_log_store;
pub mod rules_tooling;

pub use file_rule_store::FileRuleStore;
pub use memory::{MemoryReplyLogStore, MemoryRuleStore};
pub use ndjson_log_store::{
    render_reply_log_stats_report, NdjsonReplyLogStore, ReplyLogStats,
};
pub use rules_tooling::{
    inspect_rules_file, render_rules_inspect_report, render_rules_template_report,
    render_rules_validate_report, validate_rules_file, write_rules_template, RulesInspectReport,
    RulesTemplateConfig, RulesTemplateReport, RulesValidateReport,
};
