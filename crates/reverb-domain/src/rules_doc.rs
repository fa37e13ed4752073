use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::rule::{sort_rules_for_evaluation, validate_rule, AutoReplyRule};

pub const RULES_DOCUMENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Schema-versioned rules document: the operator-authored rule set for one
/// account, as persisted by rule stores.
pub struct RulesDocument {
    pub schema_version: u32,
    pub account_id: String,
    #[serde(default)]
    pub rules: Vec<AutoReplyRule>,
}

impl RulesDocument {
    /// The enabled rules in evaluation order (priority desc, created desc).
    pub fn active_rules(&self) -> Vec<AutoReplyRule> {
        let mut rules = self
            .rules
            .iter()
            .filter(|rule| rule.enabled)
            .cloned()
            .collect::<Vec<_>>();
        sort_rules_for_evaluation(&mut rules);
        rules
    }
}

pub fn parse_rules_document(raw: &str) -> Result<RulesDocument> {
    let document = serde_json::from_str::<RulesDocument>(raw)
        .context("failed to parse rules document")?;
    validate_rules_document(&document)?;
    Ok(document)
}

pub fn load_rules_document(path: &Path) -> Result<RulesDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules document {}", path.display()))?;
    parse_rules_document(&raw)
        .with_context(|| format!("failed to load rules document {}", path.display()))
}

pub fn validate_rules_document(document: &RulesDocument) -> Result<()> {
    if document.schema_version != RULES_DOCUMENT_SCHEMA_VERSION {
        bail!(
            "unsupported rules document schema_version {} (expected {})",
            document.schema_version,
            RULES_DOCUMENT_SCHEMA_VERSION
        );
    }
    if document.account_id.trim().is_empty() {
        bail!("rules document account_id must not be empty");
    }

    let mut rule_ids = HashSet::new();
    for rule in &document.rules {
        validate_rule(rule)?;
        if rule.account_id != document.account_id {
            bail!(
                "rule '{}' belongs to account '{}' but the document is for '{}'",
                rule.id,
                rule.account_id,
                document.account_id
            );
        }
        if !rule_ids.insert(rule.id.trim().to_string()) {
            bail!("rules document contains duplicate rule id '{}'", rule.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::sample_keyword_rule;

    fn sample_document() -> RulesDocument {
        RulesDocument {
            schema_version: RULES_DOCUMENT_SCHEMA_VERSION,
            account_id: "acct-1".to_string(),
            rules: vec![
                sample_keyword_rule("r-low", 1, "hours"),
                sample_keyword_rule("r-high", 9, "help"),
            ],
        }
    }

    #[test]
    fn unit_parse_rules_document_rejects_unsupported_schema() {
        let raw = r#"{"schema_version": 99, "account_id": "acct-1", "rules": []}"#;
        let error = parse_rules_document(raw).expect_err("schema should fail");
        assert!(error
            .to_string()
            .contains("unsupported rules document schema_version"));
    }

    #[test]
    fn unit_validate_rules_document_rejects_duplicate_rule_ids() {
        let mut document = sample_document();
        document.rules.push(sample_keyword_rule("r-high", 3, "other"));
        let error = validate_rules_document(&document).expect_err("should fail");
        assert!(error.to_string().contains("duplicate rule id 'r-high'"));
    }

    #[test]
    fn unit_validate_rules_document_rejects_foreign_account_rule() {
        let mut document = sample_document();
        document.rules[0].account_id = "acct-other".to_string();
        let error = validate_rules_document(&document).expect_err("should fail");
        assert!(error.to_string().contains("belongs to account 'acct-other'"));
    }

    #[test]
    fn functional_active_rules_filters_disabled_and_orders_by_priority() {
        let mut document = sample_document();
        document.rules.push({
            let mut rule = sample_keyword_rule("r-disabled", 99, "off");
            rule.enabled = false;
            rule
        });
        let active = document.active_rules();
        let ids = active.iter().map(|rule| rule.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["r-high", "r-low"]);
    }

    #[test]
    fn integration_rules_document_round_trips_through_parse() {
        let document = sample_document();
        let encoded = serde_json::to_string_pretty(&document).expect("encode");
        let decoded = parse_rules_document(&encoded).expect("parse");
        assert_eq!(document, decoded);
    }
}
