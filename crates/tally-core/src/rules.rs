//! Attribute rules over vault items.
//!
//! A [`FilterRule`] compares one attribute of an [`Item`] against a configured
//! value; a [`RuleGroup`] combines rules with AND/OR. Evaluation never fails:
//! misconfigured rules (blank value, malformed regex, an operator the
//! attribute does not support) simply do not match.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{normalize_tag, Item};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Filename,
    Filepath,
    Filetype,
    Tag,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    MatchesRegex,
    NotMatchesRegex,
}

impl RuleOperator {
    pub fn is_regex(&self) -> bool {
        matches!(self, RuleOperator::MatchesRegex | RuleOperator::NotMatchesRegex)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: String,
}

impl FilterRule {
    pub fn new(rule_type: RuleType, operator: RuleOperator, value: impl Into<String>) -> Self {
        Self {
            rule_type,
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
}

impl RuleGroup {
    /// A group is configured when at least one rule carries a value. Callers
    /// skip unconfigured groups instead of evaluating them.
    pub fn is_configured(&self) -> bool {
        self.rules.iter().any(|r| !r.value.trim().is_empty())
    }
}

/// The configured comparison value of a rule, classified up front.
#[derive(Debug, Clone)]
pub enum RuleValue {
    /// Blank value: the rule is not set up and never matches
    Empty,
    Text(String),
    Regex(Regex),
    /// A regex operator whose value did not compile
    InvalidRegex(String),
}

impl RuleValue {
    pub fn parse(operator: RuleOperator, raw: &str) -> Self {
        if raw.trim().is_empty() {
            return RuleValue::Empty;
        }
        if !operator.is_regex() {
            return RuleValue::Text(raw.to_string());
        }
        match parse_regex_literal(raw) {
            Ok(regex) => RuleValue::Regex(regex),
            Err(err) => {
                tracing::debug!(value = raw, error = %err, "rule regex rejected");
                RuleValue::InvalidRegex(raw.to_string())
            }
        }
    }
}

/// Compile a `/pattern/flags` literal. A value without surrounding slashes is
/// taken as a bare pattern.
pub fn parse_regex_literal(raw: &str) -> Result<Regex, CoreError> {
    let raw = raw.trim();
    let (pattern, flags) = match raw.strip_prefix('/').and_then(|rest| {
        rest.rfind('/').map(|idx| (&rest[..idx], &rest[idx + 1..]))
    }) {
        Some(parts) => parts,
        None => (raw, ""),
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            // Global/sticky/unicode change iteration, not whether a match exists.
            'g' | 'y' | 'u' => {}
            other => {
                return Err(CoreError::Configuration(format!(
                    "unsupported regex flag '{}' in {}",
                    other, raw
                )))
            }
        }
    }
    builder
        .build()
        .map_err(|e| CoreError::Configuration(format!("invalid regex {}: {}", raw, e)))
}

enum Target<'a> {
    Text(&'a str),
    Tags(BTreeSet<String>),
}

fn resolve_target(item: &Item, rule_type: RuleType) -> Target<'_> {
    match rule_type {
        RuleType::Filename => Target::Text(&item.name),
        RuleType::Filepath => Target::Text(&item.path),
        RuleType::Filetype => Target::Text(&item.extension),
        RuleType::Tag => Target::Tags(item.normalized_tags()),
    }
}

/// A rule with its value pre-parsed, for evaluating many items.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule_type: RuleType,
    operator: RuleOperator,
    value: RuleValue,
}

impl CompiledRule {
    pub fn new(rule: &FilterRule) -> Self {
        Self {
            rule_type: rule.rule_type,
            operator: rule.operator,
            value: RuleValue::parse(rule.operator, &rule.value),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match (&self.value, resolve_target(item, self.rule_type)) {
            (RuleValue::Empty, _) | (RuleValue::InvalidRegex(_), _) => false,
            (RuleValue::Regex(regex), Target::Text(target)) => match self.operator {
                RuleOperator::MatchesRegex => regex.is_match(target),
                RuleOperator::NotMatchesRegex => !regex.is_match(target),
                _ => false,
            },
            (RuleValue::Text(value), Target::Text(target)) => {
                match_text(self.operator, target, value)
            }
            (RuleValue::Text(value), Target::Tags(tags)) => {
                let wanted = normalize_tag(value);
                match self.operator {
                    RuleOperator::Equals => tags.contains(&wanted),
                    RuleOperator::NotEquals => !tags.contains(&wanted),
                    _ => false,
                }
            }
            (RuleValue::Regex(_), Target::Tags(_)) => false,
        }
    }
}

fn match_text(operator: RuleOperator, target: &str, value: &str) -> bool {
    let target = target.to_lowercase();
    let value = value.to_lowercase();
    match operator {
        RuleOperator::Contains => target.contains(&value),
        RuleOperator::NotContains => !target.contains(&value),
        RuleOperator::Equals => target == value,
        RuleOperator::NotEquals => target != value,
        RuleOperator::StartsWith => target.starts_with(&value),
        RuleOperator::EndsWith => target.ends_with(&value),
        RuleOperator::MatchesRegex | RuleOperator::NotMatchesRegex => false,
    }
}

/// A rule group with every rule compiled.
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    logic: Logic,
    rules: Vec<CompiledRule>,
}

impl CompiledGroup {
    pub fn new(group: &RuleGroup) -> Self {
        Self {
            logic: group.logic,
            rules: group.rules.iter().map(CompiledRule::new).collect(),
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self.logic {
            Logic::And => self.rules.iter().all(|r| r.matches(item)),
            Logic::Or => self.rules.iter().any(|r| r.matches(item)),
        }
    }
}

/// Evaluate a single rule against an item.
pub fn evaluate(item: &Item, rule: &FilterRule) -> bool {
    CompiledRule::new(rule).matches(item)
}

/// Evaluate a rule group: AND needs every rule, OR needs at least one.
pub fn evaluate_group(item: &Item, group: &RuleGroup) -> bool {
    CompiledGroup::new(group).matches(item)
}
