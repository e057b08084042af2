//! compiler.rs - Manages the compilation and caching of resolved rule sets.
//!
//! Converts the active rules of a `ResolvedRuleSet` into `CompiledRules`.
//! Compiled sets are cached process-wide. The key is the active rules
//! themselves plus the scan limits, compared exactly, so a re-enriched or
//! edited rule always compiles fresh. The cache holds at most
//! `COMPILED_CACHE_CAPACITY` sets and evicts the oldest entry first.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::config::{Rule, ScanConfig};
use crate::errors::DocshieldError;
use crate::template::ResolvedRuleSet;

/// A single compiled, active rule.
#[derive(Debug)]
pub struct CompiledRule {
    pub regex: Regex,
    /// Position of the rule in the resolved template.
    pub order: usize,
    pub rule: Rule,
}

/// The compiled form of a template's active rules, in resolution order.
#[derive(Debug)]
pub struct CompiledRules {
    pub rules: Vec<CompiledRule>,
}

pub const COMPILED_CACHE_CAPACITY: usize = 64;

lazy_static! {
    static ref COMPILED_RULES_CACHE: RwLock<CompiledCache> = RwLock::new(CompiledCache::new(COMPILED_CACHE_CAPACITY));
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    rules: Vec<(usize, Rule)>,
    max_pattern_length: usize,
    regex_size_limit: usize,
}

impl CacheKey {
    fn new(rule_set: &ResolvedRuleSet, scan: &ScanConfig) -> Self {
        CacheKey {
            rules: rule_set.active_rules().map(|(order, rule)| (order, rule.clone())).collect(),
            max_pattern_length: scan.max_pattern_length,
            regex_size_limit: scan.regex_size_limit,
        }
    }
}

/// A bounded map from rule sets to their compiled form, evicting in insertion order.
#[derive(Debug)]
struct CompiledCache {
    capacity: usize,
    next_seq: u64,
    entries: HashMap<CacheKey, (u64, Arc<CompiledRules>)>,
}

impl CompiledCache {
    fn new(capacity: usize) -> Self {
        CompiledCache { capacity: capacity.max(1), next_seq: 0, entries: HashMap::new() }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<CompiledRules>> {
        self.entries.get(key).map(|(_, rules)| Arc::clone(rules))
    }

    fn insert(&mut self, key: CacheKey, rules: Arc<CompiledRules>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (seq, _))| *seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, (self.next_seq, rules));
        self.next_seq += 1;
    }
}

/// Compiles the active rules of a set. Inactive rules are skipped entirely.
pub fn compile_rules(rule_set: &ResolvedRuleSet, scan: &ScanConfig) -> Result<CompiledRules, DocshieldError> {
    debug!("Compiling active rules of template '{}'.", rule_set.template_id);

    let mut compiled = Vec::new();
    for (order, rule) in rule_set.active_rules() {
        if rule.pattern.len() > scan.max_pattern_length {
            return Err(DocshieldError::PatternLengthExceeded(
                rule.id.clone(),
                rule.pattern.len(),
                scan.max_pattern_length,
            ));
        }

        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(rule.case_insensitive)
            .multi_line(rule.multiline)
            .dot_matches_new_line(rule.dot_matches_new_line)
            .size_limit(scan.regex_size_limit)
            .build()
            .map_err(|e| DocshieldError::RuleCompilation(rule.id.clone(), e))?;

        log::debug!(target: "docshield_core::compiler", "Rule '{}' compiled successfully.", rule.id);
        compiled.push(CompiledRule { regex, order, rule: rule.clone() });
    }

    debug!("Finished compiling rules. Total compiled: {}.", compiled.len());
    Ok(CompiledRules { rules: compiled })
}

/// Gets the compiled form of a rule set from the cache, compiling on a miss.
pub fn get_or_compile_rules(
    rule_set: &ResolvedRuleSet,
    scan: &ScanConfig,
) -> Result<Arc<CompiledRules>, DocshieldError> {
    let key = CacheKey::new(rule_set, scan);

    {
        let cache = COMPILED_RULES_CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(rules) = cache.get(&key) {
            debug!("Serving compiled rules of template '{}' from cache.", rule_set.template_id);
            return Ok(rules);
        }
    }

    let compiled = Arc::new(compile_rules(rule_set, scan)?);
    COMPILED_RULES_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, Arc::clone(&compiled));
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{bump_version, repair_rule};

    fn rule(id: &str, pattern: &str, active: bool) -> Rule {
        let r = Rule {
            id: id.to_string(),
            name: id.to_string(),
            pattern: pattern.to_string(),
            is_active: active,
            ..Default::default()
        };
        repair_rule(&r).unwrap()
    }

    #[test]
    fn inactive_rules_are_not_compiled_but_keep_order_gaps() {
        let set = ResolvedRuleSet {
            template_id: "t".to_string(),
            rules: vec![rule("a", "a", true), rule("b", "b", false), rule("c", "c", true)],
        };
        let compiled = compile_rules(&set, &ScanConfig::default()).unwrap();
        let orders: Vec<usize> = compiled.rules.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 2]);
    }

    #[test]
    fn reports_the_failing_rule() {
        let set = ResolvedRuleSet {
            template_id: "t".to_string(),
            rules: vec![rule("ok", "x", true), rule("broken", "(x", true)],
        };
        match compile_rules(&set, &ScanConfig::default()) {
            Err(DocshieldError::RuleCompilation(id, _)) => assert_eq!(id, "broken"),
            other => panic!("unexpected: {:?}", other.map(|c| c.rules.len())),
        }
    }

    #[test]
    fn enforces_pattern_length() {
        let set = ResolvedRuleSet {
            template_id: "t".to_string(),
            rules: vec![rule("long", &"a".repeat(20), true)],
        };
        let scan = ScanConfig { max_pattern_length: 10, ..Default::default() };
        assert_eq!(compile_rules(&set, &scan).unwrap_err().kind(), "pattern_length_exceeded");
    }

    #[test]
    fn cache_returns_shared_instance() {
        let set = ResolvedRuleSet {
            template_id: "cache".to_string(),
            rules: vec![rule("z", "zz+", true)],
        };
        let a = get_or_compile_rules(&set, &ScanConfig::default()).unwrap();
        let b = get_or_compile_rules(&set, &ScanConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn cache_evicts_the_oldest_set_past_capacity() {
        let mut cache = CompiledCache::new(2);
        let scan = ScanConfig::default();
        let sets: Vec<ResolvedRuleSet> = ["a1", "b2", "c3"]
            .iter()
            .map(|p| ResolvedRuleSet { template_id: "t".to_string(), rules: vec![rule(p, p, true)] })
            .collect();
        for set in &sets {
            let compiled = Arc::new(compile_rules(set, &scan).unwrap());
            cache.insert(CacheKey::new(set, &scan), compiled);
        }
        assert_eq!(cache.entries.len(), 2);
        assert!(cache.get(&CacheKey::new(&sets[0], &scan)).is_none());
        assert!(cache.get(&CacheKey::new(&sets[2], &scan)).is_some());
    }

    #[test]
    fn new_checksum_is_a_new_cache_entry() {
        let scan = ScanConfig::default();
        let v1 = rule("k", "k+", true);
        let mut v2 = v1.clone();
        bump_version(&mut v2, "k+");
        let a = ResolvedRuleSet { template_id: "t".to_string(), rules: vec![v1] };
        let b = ResolvedRuleSet { template_id: "t".to_string(), rules: vec![v2] };
        assert_ne!(CacheKey::new(&a, &scan), CacheKey::new(&b, &scan));
    }

    #[test]
    fn case_insensitive_flag_is_honored() {
        let mut r = rule("ci", "mrn", true);
        r.case_insensitive = true;
        let set = ResolvedRuleSet { template_id: "t".to_string(), rules: vec![r] };
        let compiled = compile_rules(&set, &ScanConfig::default()).unwrap();
        assert!(compiled.rules[0].regex.is_match("MRN 5"));
    }
}
