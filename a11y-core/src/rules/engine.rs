use anyhow::anyhow;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

use super::color_contrast::ColorContrastRule;
use super::custom::AttributeRequirementRule;
use super::error_identification::ErrorIdentificationRule;
use super::focus_order::FocusOrderRule;
use super::form_label::FormLabelRule;
use super::heading_structure::HeadingStructureRule;
use super::image_alt::ImageAltTextRule;
use super::keyboard_access::KeyboardAccessibilityRule;
use super::language::LanguageAttributeRule;
use super::link_purpose::LinkPurposeRule;
use super::reserved::{PronunciationRule, ReadingLevelRule, SignLanguageRule};
use super::table_headers::TableHeadersRule;
use super::Rule;
use crate::config::ComplianceConfig;
use crate::dom::Document;
use crate::error::A11yError;
use crate::types::{RuleDescriptor, Violation};

/// Ordered, immutable set of active rules.
///
/// Built once from a [`ComplianceConfig`] and safe to share between threads.
/// Evaluation output is in rule order, then document order within a rule.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new(config: &ComplianceConfig) -> Result<Self, A11yError> {
        Self::with_custom_rules(config, Vec::new())
    }

    /// Built-in rules, then the declarative rules from `config`, then
    /// `extra_rules`. Every rule is kept only if `config` includes its level.
    pub fn with_custom_rules(
        config: &ComplianceConfig,
        extra_rules: Vec<Box<dyn Rule>>,
    ) -> Result<Self, A11yError> {
        let mut candidates: Vec<Box<dyn Rule>> = vec![
            // Level A
            Box::new(ImageAltTextRule),
            Box::new(FormLabelRule),
            Box::new(HeadingStructureRule),
            Box::new(LinkPurposeRule),
            Box::new(TableHeadersRule),
            Box::new(KeyboardAccessibilityRule),
            Box::new(FocusOrderRule),
            Box::new(LanguageAttributeRule::new(&config.default_language)),
            Box::new(ErrorIdentificationRule),
            // Level AA
            Box::new(ColorContrastRule),
            // Level AAA
            Box::new(SignLanguageRule),
            Box::new(ReadingLevelRule),
            Box::new(PronunciationRule),
        ];

        for custom in &config.custom_rules {
            candidates.push(Box::new(AttributeRequirementRule::new(custom.clone())?));
        }
        candidates.extend(extra_rules);

        let mut seen = HashSet::new();
        for rule in &candidates {
            let id = rule.id();
            if id.trim().is_empty() {
                return Err(A11yError::Config("rule id must not be empty".to_string()));
            }
            if !seen.insert(id.to_string()) {
                return Err(A11yError::Config(format!("duplicate rule id: {id}")));
            }
        }

        let rules: Vec<Box<dyn Rule>> = candidates
            .into_iter()
            .filter(|rule| config.includes(rule.level()))
            .collect();
        debug!("Rule engine initialised with {} active rules", rules.len());

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.id() == id)
            .map(|rule| rule.as_ref())
    }

    pub fn active_rules(&self) -> Vec<RuleDescriptor> {
        self.rules.iter().map(|rule| rule.descriptor()).collect()
    }

    /// Run every active rule. A rule that errors or panics is logged and
    /// contributes nothing; the remaining rules still run.
    pub fn evaluate(&self, document: &Document) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in &self.rules {
            let start = Instant::now();
            match run_evaluation(rule.as_ref(), document) {
                Ok(found) => {
                    let before = found.len();
                    let found: Vec<Violation> = found
                        .into_iter()
                        .filter(|v| v.rule_id() == rule.id())
                        .collect();
                    if found.len() != before {
                        warn!(
                            "Rule {} reported {} violation(s) under a foreign rule id; dropped",
                            rule.id(),
                            before - found.len()
                        );
                    }
                    debug!(
                        "{}: {} violation(s) in {:.2}ms",
                        rule.id(),
                        found.len(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                    violations.extend(found);
                }
                Err(e) => warn!("{e}"),
            }
        }

        violations
    }
}

fn run_evaluation(rule: &dyn Rule, document: &Document) -> Result<Vec<Violation>, A11yError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(document)))
        .unwrap_or_else(|panic| Err(anyhow!(panic_message(panic.as_ref()))));
    outcome.map_err(|e| A11yError::RuleEvaluation {
        rule_id: rule.id().to_string(),
        reason: e.to_string(),
    })
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
