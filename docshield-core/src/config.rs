//! Configuration management for `docshield-core`.
//!
//! This module defines the core data structures for redaction rules and the
//! engine configuration. It handles (de)serialization of YAML rule files and
//! engine settings and validates both on load.
//!
//! License: MIT OR Apache-2.0

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DocshieldError;

/// Default maximum allowed length for a regex pattern string.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Coarse rule family chosen by the rule author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Medical,
    Pii,
    Financial,
    Legal,
    #[default]
    Custom,
}

/// Rule severity. Declaration order is the precedence order, so `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// Structural checks applied to a regex hit before it counts as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    Ssn,
    CreditCard,
    UkNino,
}

/// A single user-owned redaction rule.
///
/// `version` and `checksum` are integrity metadata. They are optional here
/// because stored records may predate them; the integrity gate refuses to
/// match with a rule until both are present and consistent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    /// The regex pattern source.
    pub pattern: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub version: Option<u32>,
    pub checksum: Option<String>,
    pub is_active: bool,
    /// Fine-grained entity type reported to reviewers (e.g. "ssn", "diagnosis").
    pub entity_type: Option<String>,
    pub description: Option<String>,
    pub case_insensitive: bool,
    pub multiline: bool,
    pub dot_matches_new_line: bool,
    pub validator: Option<ValidatorKind>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            pattern: String::new(),
            category: RuleCategory::Custom,
            severity: Severity::Medium,
            version: None,
            checksum: None,
            is_active: true,
            entity_type: None,
            description: None,
            case_insensitive: false,
            multiline: false,
            dot_matches_new_line: false,
            validator: None,
        }
    }
}

impl Hash for Rule {
    // Fields that influence compiled regexes or the matches they produce.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
        self.pattern.hash(state);
        self.checksum.hash(state);
        self.category.hash(state);
        self.severity.hash(state);
        self.entity_type.hash(state);
        self.validator.hash(state);
        self.case_insensitive.hash(state);
        self.multiline.hash(state);
        self.dot_matches_new_line.hash(state);
    }
}

impl Rule {
    /// The entity type reported for matches of this rule.
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_deref().unwrap_or(&self.name)
    }
}

/// A standalone list of rules, as loaded from a YAML file for headless use.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleFile {
    pub rules: Vec<Rule>,
}

impl RuleFile {
    /// Loads rules from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading rules from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        let file = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse rule file {}", path.display()))?;
        info!("Loaded {} rules from file {}.", file.rules.len(), path.display());
        Ok(file)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: RuleFile = serde_yml::from_str(text)?;
        validate_rules(&file.rules)?;
        Ok(file)
    }
}

/// Validates rule definitions: ids present and unique, patterns non-empty and compilable.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    let mut rule_ids = HashSet::new();
    let mut errors = Vec::new();

    for rule in rules {
        if rule.id.is_empty() {
            errors.push(format!("Rule '{}' has an empty `id` field.", rule.name));
        } else if !rule_ids.insert(rule.id.as_str()) {
            errors.push(format!("Duplicate rule id found: '{}'.", rule.id));
        }

        if rule.pattern.is_empty() {
            errors.push(format!("Rule '{}' has an empty `pattern` field.", rule.id));
            continue;
        }
        if rule.pattern.len() > MAX_PATTERN_LENGTH {
            errors.push(format!(
                "Rule '{}': pattern length ({}) exceeds maximum allowed ({}).",
                rule.id,
                rule.pattern.len(),
                MAX_PATTERN_LENGTH
            ));
            continue;
        }
        if let Err(e) = Regex::new(&rule.pattern) {
            errors.push(format!("Rule '{}' has an invalid regex pattern: {}", rule.id, e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Rule validation failed:\n{}", errors.join("\n")))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Character written over every non-whitespace character of a confirmed span.
    pub mask_char: String,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self { mask_char: "█".to_string() }
    }
}

impl MaskingConfig {
    pub fn mask_char(&self) -> char {
        self.mask_char.chars().next().unwrap_or('█')
    }
}

/// Bounded retry policy for rule-store reads during template resolution.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_ms: 25 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub max_pattern_length: usize,
    /// Upper bound for a single compiled regex, in bytes.
    pub regex_size_limit: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_pattern_length: MAX_PATTERN_LENGTH,
            regex_size_limit: 10 * (1 << 20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSONL audit trail destination. Disabled when unset.
    pub path: Option<PathBuf>,
}

/// Represents the top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub masking: MaskingConfig,
    pub resolver: ResolverConfig,
    pub scan: ScanConfig,
    pub audit: AuditConfig,
}

impl EngineConfig {
    /// Loads engine settings from a YAML file. Missing sections take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: EngineConfig = serde_yml::from_str(text)?;
        config.validate()?;
        debug!("Engine config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), DocshieldError> {
        let mut chars = self.masking.mask_char.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => {}
            _ => {
                return Err(DocshieldError::Config(format!(
                    "masking.mask_char must be exactly one non-whitespace character, got {:?}",
                    self.masking.mask_char
                )))
            }
        }
        if self.resolver.max_attempts == 0 {
            return Err(DocshieldError::Config(
                "resolver.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.scan.max_pattern_length == 0 {
            return Err(DocshieldError::Config(
                "scan.max_pattern_length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_high_above_low() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn partial_config_takes_defaults() {
        let cfg = EngineConfig::from_yaml("masking:\n  mask_char: \"#\"\n").unwrap();
        assert_eq!(cfg.masking.mask_char(), '#');
        assert_eq!(cfg.resolver, ResolverConfig::default());
        assert_eq!(cfg.scan.max_pattern_length, MAX_PATTERN_LENGTH);
        assert!(cfg.audit.path.is_none());
    }

    #[test]
    fn rejects_multi_char_mask() {
        let err = EngineConfig::from_yaml("masking:\n  mask_char: \"##\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("mask_char"));
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(EngineConfig::from_yaml("resolver:\n  max_attempts: 0\n").is_err());
    }

    #[test]
    fn rule_entity_type_falls_back_to_name() {
        let rule = Rule { name: "email".to_string(), ..Default::default() };
        assert_eq!(rule.entity_type(), "email");
        let rule = Rule { entity_type: Some("contact_email".to_string()), ..rule };
        assert_eq!(rule.entity_type(), "contact_email");
    }

    #[test]
    fn rule_file_rejects_duplicate_ids_and_bad_patterns() {
        let yaml = r#"
rules:
  - id: r1
    name: one
    pattern: "a+"
  - id: r1
    name: two
    pattern: "(unclosed"
"#;
        let err = RuleFile::from_yaml(yaml).unwrap_err().to_string();
        assert!(err.contains("Duplicate rule id found: 'r1'"));
        assert!(err.contains("invalid regex pattern"));
    }

    #[test]
    fn rule_file_parses_camel_case_fields() {
        let yaml = r#"
rules:
  - id: r-ssn
    name: US SSN
    pattern: '\d{3}-\d{2}-\d{4}'
    category: pii
    severity: high
    isActive: true
    entityType: ssn
    validator: ssn
"#;
        let file = RuleFile::from_yaml(yaml).unwrap();
        let rule = &file.rules[0];
        assert_eq!(rule.severity, Severity::High);
        assert_eq!(rule.category, RuleCategory::Pii);
        assert_eq!(rule.validator, Some(ValidatorKind::Ssn));
        assert!(rule.version.is_none());
        assert!(rule.checksum.is_none());
    }
}
