use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::message::{EventKind, IncomingMessage};

pub const MAX_KEYWORDS_PER_CONDITION: usize = 20;
pub const MAX_KEYWORD_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `KeywordMatchMode` values.
pub enum KeywordMatchMode {
    Exact,
    #[default]
    Partial,
}

impl KeywordMatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// A single predicate a rule requires before it fires.
pub enum Condition {
    Follow,
    Keyword {
        keywords: Vec<String>,
        #[serde(default)]
        mode: KeywordMatchMode,
    },
    Regex {
        pattern: String,
    },
}

impl Condition {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Keyword { .. } => "keyword",
            Self::Regex { .. } => "regex",
        }
    }

    /// Keyword and regex conditions only ever match events that carry text;
    /// comparisons are case-insensitive over the trimmed message text.
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        match self {
            Self::Follow => message.event_kind == EventKind::Follow,
            Self::Keyword { keywords, mode } => {
                let Some(text) = trimmed_text(message) else {
                    return false;
                };
                let normalized = text.to_lowercase();
                keywords.iter().any(|keyword| {
                    let keyword = keyword.trim().to_lowercase();
                    if keyword.is_empty() {
                        return false;
                    }
                    match mode {
                        KeywordMatchMode::Exact => normalized == keyword,
                        KeywordMatchMode::Partial => normalized.contains(&keyword),
                    }
                })
            }
            Self::Regex { pattern } => {
                let Some(text) = trimmed_text(message) else {
                    return false;
                };
                // Patterns are validated at the repository boundary; a pattern
                // that still fails to compile here never matches.
                Regex::new(pattern)
                    .map(|regex| regex.is_match(text))
                    .unwrap_or(false)
            }
        }
    }
}

fn trimmed_text(message: &IncomingMessage) -> Option<&str> {
    message
        .text
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn validate_condition(condition: &Condition, label: &str) -> Result<()> {
    match condition {
        Condition::Follow => Ok(()),
        Condition::Keyword { keywords, .. } => {
            if keywords.is_empty() {
                bail!("{label} keyword condition must include at least one keyword");
            }
            if keywords.len() > MAX_KEYWORDS_PER_CONDITION {
                bail!(
                    "{label} keyword condition exceeds {} keywords",
                    MAX_KEYWORDS_PER_CONDITION
                );
            }
            for keyword in keywords {
                let trimmed = keyword.trim();
                if trimmed.is_empty() {
                    bail!("{label} keyword condition includes an empty keyword");
                }
                if trimmed.chars().count() > MAX_KEYWORD_CHARS {
                    bail!(
                        "{label} keyword '{}' exceeds {} characters",
                        trimmed,
                        MAX_KEYWORD_CHARS
                    );
                }
            }
            Ok(())
        }
        Condition::Regex { pattern } => {
            if pattern.trim().is_empty() {
                bail!("{label} regex condition has an empty pattern");
            }
            if let Err(error) = Regex::new(pattern) {
                bail!("{label} regex pattern '{}' is invalid: {error}", pattern);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::sample_text_message;

    #[test]
    fn unit_keyword_partial_match_is_case_insensitive_substring() {
        let condition = Condition::Keyword {
            keywords: vec!["Help".to_string()],
            mode: KeywordMatchMode::Partial,
        };
        assert!(condition.matches(&sample_text_message("please HELP me")));
        assert!(condition.matches(&sample_text_message("help")));
        assert!(!condition.matches(&sample_text_message("hola")));
    }

    #[test]
    fn unit_keyword_exact_match_compares_whole_trimmed_text() {
        let condition = Condition::Keyword {
            keywords: vec!["help".to_string()],
            mode: KeywordMatchMode::Exact,
        };
        assert!(condition.matches(&sample_text_message(" Help ")));
        assert!(!condition.matches(&sample_text_message("please help")));
    }

    #[test]
    fn unit_keyword_condition_never_matches_textless_events() {
        let condition = Condition::Keyword {
            keywords: vec!["help".to_string()],
            mode: KeywordMatchMode::Partial,
        };
        let mut message = sample_text_message("help");
        message.text = None;
        assert!(!condition.matches(&message));
    }

    #[test]
    fn unit_follow_condition_matches_follow_events_only() {
        let condition = Condition::Follow;
        let mut message = sample_text_message("anything");
        assert!(!condition.matches(&message));
        message.event_kind = EventKind::Follow;
        assert!(condition.matches(&message));
    }

    #[test]
    fn unit_regex_condition_matches_pattern_against_text() {
        let condition = Condition::Regex {
            pattern: r"(?i)^order\s+\d+$".to_string(),
        };
        assert!(condition.matches(&sample_text_message("Order 42")));
        assert!(!condition.matches(&sample_text_message("order forty-two")));
    }

    #[test]
    fn unit_validate_condition_rejects_empty_keyword_set() {
        let condition = Condition::Keyword {
            keywords: Vec::new(),
            mode: KeywordMatchMode::Partial,
        };
        let error = validate_condition(&condition, "rule r-1").expect_err("should fail");
        assert!(error
            .to_string()
            .contains("must include at least one keyword"));
    }

    #[test]
    fn unit_validate_condition_rejects_invalid_regex() {
        let condition = Condition::Regex {
            pattern: "(unclosed".to_string(),
        };
        let error = validate_condition(&condition, "rule r-1").expect_err("should fail");
        assert!(error.to_string().contains("is invalid"));
    }

    #[test]
    fn regression_condition_round_trips_through_tagged_json() {
        let condition = Condition::Keyword {
            keywords: vec!["help".to_string(), "support".to_string()],
            mode: KeywordMatchMode::Exact,
        };
        let encoded = serde_json::to_string(&condition).expect("encode");
        assert!(encoded.contains("\"kind\":\"keyword\""));
        let decoded = serde_json::from_str::<Condition>(&encoded).expect("decode");
        assert_eq!(condition, decoded);
    }

    #[test]
    fn regression_keyword_mode_defaults_to_partial_when_omitted() {
        let decoded = serde_json::from_str::<Condition>(r#"{"kind":"keyword","keywords":["hi"]}"#)
            .expect("decode");
        assert_eq!(
            decoded,
            Condition::Keyword {
                keywords: vec!["hi".to_string()],
                mode: KeywordMatchMode::Partial,
            }
        );
    }
}
