//! Rule integrity metadata: checksum computation and the pre-match gate.
//!
//! A rule's checksum is a SHA-256 digest over its pattern and version only.
//! Editing any other field (name, severity, `is_active`, flags) never
//! invalidates it.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use sha2::{Digest, Sha256};

use crate::config::Rule;
use crate::errors::{DocshieldError, Result};
use crate::template::ResolvedRuleSet;

/// Version assigned to rules that were stored without one.
pub const INITIAL_RULE_VERSION: u32 = 1;

/// Computes the integrity digest for a (pattern, version) pair.
pub fn rule_checksum(pattern: &str, version: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pattern.as_bytes());
    hasher.update([0u8]);
    hasher.update(version.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// The state of a single rule's integrity metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleIntegrity {
    Valid,
    Missing,
    Mismatched,
}

pub fn check_rule(rule: &Rule) -> RuleIntegrity {
    let version = match rule.version {
        Some(v) if v >= INITIAL_RULE_VERSION => v,
        _ => return RuleIntegrity::Missing,
    };
    match rule.checksum.as_deref() {
        None | Some("") => RuleIntegrity::Missing,
        Some(stored) if stored.eq_ignore_ascii_case(&rule_checksum(&rule.pattern, version)) => {
            RuleIntegrity::Valid
        }
        Some(_) => RuleIntegrity::Mismatched,
    }
}

/// Returns a copy of `rule` with repaired metadata, or `None` when it is already valid.
///
/// Keeps an existing version and only fills in `INITIAL_RULE_VERSION` when absent.
/// The result is a pure function of the rule's own (pattern, version), so
/// concurrent repairs of the same rule converge.
pub fn repair_rule(rule: &Rule) -> Option<Rule> {
    if check_rule(rule) == RuleIntegrity::Valid {
        return None;
    }
    let version = match rule.version {
        Some(v) if v >= INITIAL_RULE_VERSION => v,
        _ => INITIAL_RULE_VERSION,
    };
    let mut repaired = rule.clone();
    repaired.version = Some(version);
    repaired.checksum = Some(rule_checksum(&rule.pattern, version));
    Some(repaired)
}

/// Bumps the version of an edited rule and recomputes its checksum.
pub fn bump_version(rule: &mut Rule, new_pattern: impl Into<String>) {
    let next = rule.version.unwrap_or(0) + 1;
    rule.pattern = new_pattern.into();
    rule.version = Some(next);
    rule.checksum = Some(rule_checksum(&rule.pattern, next));
}

/// Checks every rule of the set in resolution order and fails on the first bad one.
pub fn validate(rule_set: &ResolvedRuleSet) -> Result<()> {
    for rule in &rule_set.rules {
        match check_rule(rule) {
            RuleIntegrity::Valid => {}
            RuleIntegrity::Missing => {
                return Err(DocshieldError::MissingMetadata {
                    template_id: rule_set.template_id.clone(),
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                })
            }
            RuleIntegrity::Mismatched => {
                return Err(DocshieldError::ChecksumMismatch {
                    template_id: rule_set.template_id.clone(),
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                })
            }
        }
    }
    debug!(
        "Template '{}': all {} rules passed the integrity gate.",
        rule_set.template_id,
        rule_set.rules.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, pattern: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: format!("rule {}", id),
            pattern: pattern.to_string(),
            ..Default::default()
        }
    }

    fn sealed(id: &str, pattern: &str) -> Rule {
        repair_rule(&rule(id, pattern)).unwrap()
    }

    fn set(rules: Vec<Rule>) -> ResolvedRuleSet {
        ResolvedRuleSet { template_id: "tpl".to_string(), rules }
    }

    #[test]
    fn checksum_depends_on_pattern_and_version_only() {
        let a = rule_checksum(r"\d+", 1);
        assert_eq!(a, rule_checksum(r"\d+", 1));
        assert_ne!(a, rule_checksum(r"\d+", 2));
        assert_ne!(a, rule_checksum(r"\d*", 1));
        assert_eq!(a.len(), 64);

        let mut r = sealed("r1", r"\d+");
        r.is_active = false;
        r.name = "renamed".to_string();
        assert_eq!(check_rule(&r), RuleIntegrity::Valid);
    }

    #[test]
    fn pattern_and_version_cannot_collide_through_concatenation() {
        assert_ne!(rule_checksum("a1", 1), rule_checksum("a", 11));
    }

    #[test]
    fn repair_fills_version_and_is_noop_on_valid_rules() {
        let fixed = repair_rule(&rule("r1", "x")).unwrap();
        assert_eq!(fixed.version, Some(1));
        assert_eq!(check_rule(&fixed), RuleIntegrity::Valid);
        assert!(repair_rule(&fixed).is_none());
    }

    #[test]
    fn repair_keeps_existing_version() {
        let mut r = rule("r1", "x");
        r.version = Some(4);
        let fixed = repair_rule(&r).unwrap();
        assert_eq!(fixed.version, Some(4));
        assert_eq!(fixed.checksum.unwrap(), rule_checksum("x", 4));
    }

    #[test]
    fn tampered_pattern_is_a_mismatch() {
        let mut r = sealed("r1", "abc");
        r.pattern = "abd".to_string();
        assert_eq!(check_rule(&r), RuleIntegrity::Mismatched);
    }

    #[test]
    fn bump_version_reseals() {
        let mut r = sealed("r1", "abc");
        bump_version(&mut r, "abcd");
        assert_eq!(r.version, Some(2));
        assert_eq!(check_rule(&r), RuleIntegrity::Valid);

        let mut fresh = rule("r2", "x");
        bump_version(&mut fresh, "y");
        assert_eq!(fresh.version, Some(1));
    }

    #[test]
    fn validate_names_first_offending_rule() {
        let rules = vec![sealed("r1", "a"), rule("r2", "b"), rule("r3", "c")];
        match validate(&set(rules)) {
            Err(DocshieldError::MissingMetadata { rule_id, template_id, .. }) => {
                assert_eq!(rule_id, "r2");
                assert_eq!(template_id, "tpl");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn validate_reports_mismatch_before_later_missing() {
        let mut tampered = sealed("r1", "a");
        tampered.checksum = Some("0".repeat(64));
        let rules = vec![tampered, rule("r2", "b")];
        let err = validate(&set(rules)).unwrap_err();
        assert_eq!(err.kind(), "checksum_mismatch");
        assert_eq!(err.offending_rule(), Some(("tpl", "r1")));
    }

    #[test]
    fn validate_rejects_zero_version_and_empty_checksum() {
        let mut r = sealed("r1", "a");
        r.version = Some(0);
        assert!(validate(&set(vec![r])).is_err());
        let mut r = sealed("r1", "a");
        r.checksum = Some(String::new());
        assert_eq!(validate(&set(vec![r])).unwrap_err().kind(), "missing_metadata");
    }

    #[test]
    fn empty_rule_set_is_valid() {
        assert!(validate(&set(vec![])).is_ok());
    }
}
