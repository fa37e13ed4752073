//! Operator tooling over the rules document: starter template, validation
//! with per-rule diagnostics, and an inspection summary.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use reverb_core::{current_unix_timestamp_ms, write_text_atomic};
use reverb_domain::{
    load_rules_document, validate_rule, AutoReplyRule, Condition, KeywordMatchMode, Response,
    ResponsePayload, RulesDocument, RULES_DOCUMENT_SCHEMA_VERSION,
};
use serde::Serialize;

#[derive(Debug, Clone)]
/// Public struct `RulesTemplateConfig` used by the CLI template command.
pub struct RulesTemplateConfig {
    pub target_path: PathBuf,
    pub account_id: String,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesTemplateReport {
    pub path: PathBuf,
    pub account_id: String,
    pub rule_count: usize,
    pub overwrite: bool,
}

pub(crate) fn sample_rules_document(account_id: &str) -> RulesDocument {
    let now_unix_ms = current_unix_timestamp_ms();
    let keyword_rule = AutoReplyRule {
        id: "rule-greeting".to_string(),
        account_id: account_id.to_string(),
        name: "Greeting keywords".to_string(),
        priority: 10,
        conditions: vec![Condition::Keyword {
            keywords: vec!["hello".to_string(), "hi".to_string()],
            mode: KeywordMatchMode::Partial,
        }],
        responses: vec![Response {
            payload: ResponsePayload::Text {
                text: "Hello! An operator will get back to you shortly.".to_string(),
            },
            probability: 1.0,
        }],
        rate_limit: None,
        time_window: None,
        enabled: true,
        created_unix_ms: now_unix_ms,
        updated_unix_ms: now_unix_ms,
    };
    let follow_rule = AutoReplyRule {
        id: "rule-welcome".to_string(),
        account_id: account_id.to_string(),
        name: "Welcome new followers".to_string(),
        priority: 5,
        conditions: vec![Condition::Follow],
        responses: vec![Response {
            payload: ResponsePayload::Text {
                text: "Thanks for the follow!".to_string(),
            },
            probability: 1.0,
        }],
        rate_limit: None,
        time_window: None,
        enabled: true,
        created_unix_ms: now_unix_ms,
        updated_unix_ms: now_unix_ms,
    };
    RulesDocument {
        schema_version: RULES_DOCUMENT_SCHEMA_VERSION,
        account_id: account_id.to_string(),
        rules: vec![keyword_rule, follow_rule],
    }
}

pub fn write_rules_template(config: &RulesTemplateConfig) -> Result<RulesTemplateReport> {
    if config.target_path.exists() && !config.overwrite {
        bail!(
            "rules template path already exists (pass --overwrite): {}",
            config.target_path.display()
        );
    }
    let account_id = config.account_id.trim();
    if account_id.is_empty() {
        bail!("rules template account id must be non-empty");
    }

    let document = sample_rules_document(account_id);
    let mut payload =
        serde_json::to_string_pretty(&document).context("failed to serialize rules template")?;
    payload.push('\n');
    write_text_atomic(&config.target_path, &payload)
        .with_context(|| format!("failed to write {}", config.target_path.display()))?;

    Ok(RulesTemplateReport {
        path: config.target_path.clone(),
        account_id: account_id.to_string(),
        rule_count: document.rules.len(),
        overwrite: config.overwrite,
    })
}

pub fn render_rules_template_report(report: &RulesTemplateReport) -> String {
    format!(
        "rules template: path={} account_id={} rule_count={} overwrite={}",
        report.path.display(),
        report.account_id,
        report.rule_count,
        report.overwrite
    )
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RulesValidateReport {
    pub path: String,
    pub total_rules: usize,
    pub valid_rules: usize,
    pub invalid_rules: usize,
    pub disabled_rules: usize,
    pub diagnostics: Vec<String>,
}

impl RulesValidateReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Walks the whole document collecting every diagnostic instead of stopping
/// at the first, so operators fix a broken file in one pass.
pub fn validate_rules_file(path: &Path) -> RulesValidateReport {
    let mut report = RulesValidateReport {
        path: path.display().to_string(),
        total_rules: 0,
        valid_rules: 0,
        invalid_rules: 0,
        disabled_rules: 0,
        diagnostics: Vec::new(),
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            report.diagnostics.push(format!("read_error: {error}"));
            return report;
        }
    };
    let document = match serde_json::from_str::<RulesDocument>(&raw) {
        Ok(value) => value,
        Err(error) => {
            report.diagnostics.push(format!("json_parse: {error}"));
            return report;
        }
    };

    if document.schema_version != RULES_DOCUMENT_SCHEMA_VERSION {
        report.diagnostics.push(format!(
            "schema_version: expected {} but found {}",
            RULES_DOCUMENT_SCHEMA_VERSION, document.schema_version
        ));
    }
    if document.account_id.trim().is_empty() {
        report
            .diagnostics
            .push("account_id: must not be empty".to_string());
    }

    report.total_rules = document.rules.len();
    let mut rule_ids = HashSet::new();
    for rule in &document.rules {
        if !rule.enabled {
            report.disabled_rules = report.disabled_rules.saturating_add(1);
        }
        let mut rule_valid = true;
        if let Err(error) = validate_rule(rule) {
            rule_valid = false;
            report.diagnostics.push(format!("rule_invalid: {error}"));
        }
        if rule.account_id != document.account_id {
            rule_valid = false;
            report.diagnostics.push(format!(
                "rule_account_mismatch: rule '{}' belongs to '{}'",
                rule.id, rule.account_id
            ));
        }
        if !rule_ids.insert(rule.id.trim().to_string()) {
            rule_valid = false;
            report
                .diagnostics
                .push(format!("rule_duplicate_id: '{}'", rule.id));
        }
        if rule_valid {
            report.valid_rules = report.valid_rules.saturating_add(1);
        } else {
            report.invalid_rules = report.invalid_rules.saturating_add(1);
        }
    }
    report
}

pub fn render_rules_validate_report(report: &RulesValidateReport) -> String {
    let mut lines = vec![format!(
        "rules validate: path={} total_rules={} valid_rules={} invalid_rules={} disabled_rules={} diagnostics={}",
        report.path,
        report.total_rules,
        report.valid_rules,
        report.invalid_rules,
        report.disabled_rules,
        report.diagnostics.len(),
    )];
    for diagnostic in &report.diagnostics {
        lines.push(format!("rules validate error: {diagnostic}"));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RulesInspectReport {
    pub path: String,
    pub account_id: String,
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    pub keyword_conditions: usize,
    pub follow_conditions: usize,
    pub regex_conditions: usize,
    pub rules_with_rate_limit: usize,
    pub rules_with_time_window: usize,
    pub total_responses: usize,
}

/// Summarizes a valid rules document; a document that fails validation is an
/// error here (use `validate_rules_file` for diagnostics).
pub fn inspect_rules_file(path: &Path) -> Result<RulesInspectReport> {
    let document = load_rules_document(path)?;
    let mut report = RulesInspectReport {
        path: path.display().to_string(),
        account_id: document.account_id.clone(),
        total_rules: document.rules.len(),
        enabled_rules: 0,
        disabled_rules: 0,
        keyword_conditions: 0,
        follow_conditions: 0,
        regex_conditions: 0,
        rules_with_rate_limit: 0,
        rules_with_time_window: 0,
        total_responses: 0,
    };
    for rule in &document.rules {
        if rule.enabled {
            report.enabled_rules = report.enabled_rules.saturating_add(1);
        } else {
            report.disabled_rules = report.disabled_rules.saturating_add(1);
        }
        for condition in &rule.conditions {
            match condition {
                Condition::Keyword { .. } => {
                    report.keyword_conditions = report.keyword_conditions.saturating_add(1);
                }
                Condition::Follow => {
                    report.follow_conditions = report.follow_conditions.saturating_add(1);
                }
                Condition::Regex { .. } => {
                    report.regex_conditions = report.regex_conditions.saturating_add(1);
                }
            }
        }
        if rule.rate_limit.is_some() {
            report.rules_with_rate_limit = report.rules_with_rate_limit.saturating_add(1);
        }
        if rule.time_window.is_some() {
            report.rules_with_time_window = report.rules_with_time_window.saturating_add(1);
        }
        report.total_responses = report.total_responses.saturating_add(rule.responses.len());
    }
    Ok(report)
}

pub fn render_rules_inspect_report(report: &RulesInspectReport) -> String {
    format!(
        "rules inspect: path={} account_id={} total_rules={} enabled_rules={} disabled_rules={} keyword_conditions={} follow_conditions={} regex_conditions={} rules_with_rate_limit={} rules_with_time_window={} total_responses={}",
        report.path,
        report.account_id,
        report.total_rules,
        report.enabled_rules,
        report.disabled_rules,
        report.keyword_conditions,
        report.follow_conditions,
        report.regex_conditions,
        report.rules_with_rate_limit,
        report.rules_with_time_window,
        report.total_responses,
    )
}
