//! Rules declared in configuration: every element matching `selector` must
//! carry a non-empty `required_attribute`.

use anyhow::Result;

use super::{fix_targets, Rule};
use crate::config::CustomRuleConfig;
use crate::dom::{Document, Selector};
use crate::error::A11yError;
use crate::types::{ComplianceLevel, Violation};

const CHECK: &str = "missing-attribute";

pub struct AttributeRequirementRule {
    config: CustomRuleConfig,
    selector: Selector,
}

impl AttributeRequirementRule {
    pub fn new(config: CustomRuleConfig) -> Result<Self, A11yError> {
        if config.required_attribute.trim().is_empty() {
            return Err(A11yError::Config(format!(
                "custom rule {} has no required_attribute",
                config.id
            )));
        }
        let selector = Selector::parse(&config.selector)
            .map_err(|e| A11yError::Config(format!("custom rule {}: {e}", config.id)))?;
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &CustomRuleConfig {
        &self.config
    }
}

impl Rule for AttributeRequirementRule {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn criterion(&self) -> &str {
        &self.config.criterion
    }

    fn level(&self) -> ComplianceLevel {
        self.config.level
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let attribute = self.config.required_attribute.as_str();
        Ok(document
            .select(&self.selector)
            .into_iter()
            .filter(|element| document.non_empty_attr(*element, attribute).is_none())
            .map(|element| {
                let violation = Violation::new(
                    &self.config.id,
                    CHECK,
                    document,
                    element,
                    self.config.severity,
                    self.config.message.as_str(),
                )
                .with_remediation(self.config.remediation.as_str());
                if self.can_auto_fix() {
                    violation.fixable()
                } else {
                    violation
                }
            })
            .collect())
    }

    fn can_auto_fix(&self) -> bool {
        self.config.fix_value.is_some()
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let Some(value) = self.config.fix_value.as_deref() else {
            return Ok(0);
        };
        let attribute = self.config.required_attribute.as_str();
        let mut fixed = 0;
        for element in fix_targets(document, violations, CHECK) {
            if document.non_empty_attr(element, attribute).is_none() {
                document.set_attr(element, attribute, value);
                fixed += 1;
            }
        }
        Ok(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn iframe_title_rule(fix_value: Option<&str>) -> CustomRuleConfig {
        CustomRuleConfig {
            id: "custom-iframe-title".to_string(),
            description: "Frames need a title".to_string(),
            criterion: "4.1.2 Name, Role, Value".to_string(),
            level: ComplianceLevel::A,
            selector: "iframe".to_string(),
            required_attribute: "title".to_string(),
            message: "Frame has no title".to_string(),
            severity: Severity::Serious,
            remediation: "Describe the frame content in a title attribute".to_string(),
            fix_value: fix_value.map(str::to_string),
        }
    }

    #[test]
    fn test_flags_elements_without_attribute() {
        let rule = AttributeRequirementRule::new(iframe_title_rule(None)).unwrap();
        let doc = Document::parse(r#"<iframe src="/a"></iframe><iframe src="/b" title="Map"></iframe>"#);
        let violations = rule.evaluate(&doc).unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id(), "custom-iframe-title");
        assert_eq!(violations[0].message(), "Frame has no title");
        assert_eq!(violations[0].severity(), Severity::Serious);
        assert!(!violations[0].is_auto_fixable());
        assert!(!rule.can_auto_fix());
    }

    #[test]
    fn test_fix_value_makes_rule_fixable() {
        let rule = AttributeRequirementRule::new(iframe_title_rule(Some("Embedded content"))).unwrap();
        let doc = Document::parse(r#"<iframe src="/a" title=""></iframe>"#);
        let violations = rule.evaluate(&doc).unwrap();
        let mut working = doc.clone();

        assert_eq!(rule.apply_fixes(&mut working, &violations).unwrap(), 1);
        assert_eq!(rule.apply_fixes(&mut working, &violations).unwrap(), 0);
        let iframe = working.first_element_by_tag("iframe").unwrap();
        assert_eq!(working.attr(iframe, "title"), Some("Embedded content"));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let mut config = iframe_title_rule(None);
        config.selector = "iframe[".to_string();
        let err = AttributeRequirementRule::new(config).err().unwrap();
        assert!(matches!(err, A11yError::Config(_)));
        assert!(err.to_string().contains("custom-iframe-title"));
    }

    #[test]
    fn test_structural_selectors_are_accepted() {
        let doc = Document::parse(
            r#"<ul><li><a href="/a">A</a></li><li><a href="/b">B</a></li></ul>
               <h2>Prices</h2><p>From 10 EUR</p><img src="x.png" alt="">"#,
        );
        for (selector, expected) in [
            ("li:nth-child(2) a", 1),
            ("li a:last-child", 2),
            (r#"img[alt="" i]"#, 1),
            ("h2 + p", 1),
        ] {
            let mut config = iframe_title_rule(None);
            config.selector = selector.to_string();
            config.required_attribute = "data-reviewed".to_string();
            let rule = AttributeRequirementRule::new(config).unwrap();
            assert_eq!(rule.evaluate(&doc).unwrap().len(), expected, "{selector}");
        }
    }
}
