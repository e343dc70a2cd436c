//! WCAG 3.3.1 Error Identification (Level A)

use anyhow::Result;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(
    ERROR_CONTAINERS,
    ".error, .error-message, .field-error, [id*=error i], [class*=error i], [id*=invalid i], \
     [class*=invalid i], .validation-message, .alert-danger, .warning"
);
static_selector!(
    REQUIRED_FIELDS,
    "input[required], select[required], textarea[required]"
);
static_selector!(DESCRIBED, "[aria-describedby]");
static_selector!(INVALID, "[aria-invalid=true i]");

const RULE_ID: &str = "3.3.1-error-identification";

const FORM_CONTROLS: &[&str] = &["input", "select", "textarea", "button", "option", "form"];

pub struct ErrorIdentificationRule;

impl Rule for ErrorIdentificationRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Input errors must be identified and described in text"
    }

    fn criterion(&self) -> &str {
        "3.3.1 Error Identification"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for container in document.select(&ERROR_CONTAINERS) {
            if document.is_tag(container, FORM_CONTROLS) || is_announced(document, container) {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "unannounced-error",
                    document,
                    container,
                    Severity::Serious,
                    "Error message container is not announced to assistive technology",
                )
                .with_remediation("Add role=\"alert\" and aria-live=\"assertive\" to the container")
                .fixable(),
            );
        }

        for field in document.select(&REQUIRED_FIELDS) {
            if document.has_attr(field, "aria-required") {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "missing-aria-required",
                    document,
                    field,
                    Severity::Moderate,
                    "Required field does not expose aria-required",
                )
                .with_remediation("Add aria-required=\"true\"")
                .fixable(),
            );
        }

        let ids = document.id_index();
        for element in document.select(&DESCRIBED) {
            let missing: Vec<&str> = document
                .attr(element, "aria-describedby")
                .unwrap_or_default()
                .split_whitespace()
                .filter(|id| !ids.contains_key(id))
                .collect();
            if missing.is_empty() {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "dangling-describedby",
                    document,
                    element,
                    Severity::Serious,
                    format!("aria-describedby references missing element(s): {}", missing.join(", ")),
                )
                .with_remediation("Point aria-describedby at the id of the element holding the description"),
            );
        }

        for element in document.select(&INVALID) {
            let described = document.non_empty_attr(element, "aria-describedby").is_some()
                || document.non_empty_attr(element, "aria-errormessage").is_some();
            if described {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "invalid-without-description",
                    document,
                    element,
                    Severity::Serious,
                    "Field is marked invalid but no error description is associated",
                )
                .with_remediation("Reference the error text with aria-describedby or aria-errormessage"),
            );
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;

        for container in fix_targets(document, violations, "unannounced-error") {
            if is_announced(document, container) {
                continue;
            }
            document.set_attr(container, "role", "alert");
            document.set_attr(container, "aria-live", "assertive");
            fixed += 1;
        }

        for field in fix_targets(document, violations, "missing-aria-required") {
            if !document.has_attr(field, "aria-required") {
                document.set_attr(field, "aria-required", "true");
                fixed += 1;
            }
        }

        Ok(fixed)
    }
}

/// A live-region role or an `aria-live` politeness setting.
fn is_announced(document: &Document, element: NodeId) -> bool {
    let role = document
        .attr(element, "role")
        .is_some_and(|role| role.eq_ignore_ascii_case("alert") || role.eq_ignore_ascii_case("status"));
    let live = document.attr(element, "aria-live").is_some_and(|live| {
        live.eq_ignore_ascii_case("assertive") || live.eq_ignore_ascii_case("polite")
    });
    role || live
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(markup: &str) -> Vec<String> {
        ErrorIdentificationRule
            .evaluate(&Document::parse(markup))
            .unwrap()
            .iter()
            .map(|v| v.check().to_string())
            .collect()
    }

    #[test]
    fn test_unannounced_error_container() {
        assert_eq!(
            checks(r#"<div class="error-message">Email is invalid</div>"#),
            vec!["unannounced-error"]
        );
        assert!(checks(r#"<div class="error-message" role="alert">Email is invalid</div>"#).is_empty());
        assert!(checks(r#"<span id="email-error" aria-live="polite">Required</span>"#).is_empty());
    }

    #[test]
    fn test_form_controls_are_not_containers() {
        assert!(checks(r#"<input class="is-invalid" aria-describedby="hint"><p id="hint">Hint</p>"#).is_empty());
    }

    #[test]
    fn test_required_without_aria_required() {
        assert_eq!(checks(r#"<input id="n" required>"#), vec!["missing-aria-required"]);
        assert!(checks(r#"<input id="n" required aria-required="true">"#).is_empty());
    }

    #[test]
    fn test_describedby_and_invalid() {
        assert_eq!(
            checks(r#"<input aria-describedby="gone">"#),
            vec!["dangling-describedby"]
        );
        assert_eq!(
            checks(r#"<input aria-invalid="true">"#),
            vec!["invalid-without-description"]
        );
        assert!(checks(r#"<input aria-invalid="true" aria-errormessage="e"><p id="e">Bad</p>"#).is_empty());
    }

    #[test]
    fn test_fixes_are_idempotent() {
        let doc = Document::parse(
            r#"<form><input name="email" required><div class="field-error">Enter an email</div></form>"#,
        );
        let violations = ErrorIdentificationRule.evaluate(&doc).unwrap();
        let mut working = doc.clone();

        assert_eq!(ErrorIdentificationRule.apply_fixes(&mut working, &violations).unwrap(), 2);
        assert_eq!(ErrorIdentificationRule.apply_fixes(&mut working, &violations).unwrap(), 0);
        assert!(ErrorIdentificationRule.evaluate(&working).unwrap().is_empty());

        let container = working.first_element_by_tag("div").unwrap();
        assert_eq!(working.attr(container, "role"), Some("alert"));
        assert_eq!(working.attr(container, "aria-live"), Some("assertive"));
    }
}
