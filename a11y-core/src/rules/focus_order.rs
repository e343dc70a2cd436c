//! WCAG 2.4.3 Focus Order (Level A)

use anyhow::Result;

use super::keyboard_access::tabindex;
use super::{fix_targets, Rule};
use crate::dom::Document;
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(TABINDEXED, "[tabindex]");

const RULE_ID: &str = "2.4.3-focus-order";

pub struct FocusOrderRule;

impl Rule for FocusOrderRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Focus order must follow the reading order"
    }

    fn criterion(&self) -> &str {
        "2.4.3 Focus Order"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        Ok(document
            .select(&TABINDEXED)
            .into_iter()
            .filter(|element| tabindex(document, *element).is_some_and(|value| value > 0))
            .map(|element| {
                Violation::new(
                    RULE_ID,
                    "positive-tabindex",
                    document,
                    element,
                    Severity::Serious,
                    "Positive tabindex creates a focus order that differs from the reading order",
                )
                .with_remediation("Set tabindex to 0 and arrange elements in reading order")
                .fixable()
            })
            .collect())
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;
        for element in fix_targets(document, violations, "positive-tabindex") {
            if tabindex(document, element).is_some_and(|value| value > 0) {
                document.set_attr(element, "tabindex", "0");
                fixed += 1;
            }
        }
        Ok(fixed)
    }
}
