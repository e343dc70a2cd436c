//! WCAG 2.1.1 Keyboard (Level A)
//!
//! Mouse-only handlers, tabindex misuse and drag interactions without a
//! keyboard alternative.

use anyhow::Result;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(
    MOUSE_HANDLERS,
    "[onclick], [onmousedown], [onmouseup], [onmouseover], [ondblclick]"
);
static_selector!(TABINDEXED, "[tabindex]");
static_selector!(
    INTERACTIVE,
    "a[href], button, input:not([type=hidden]), select, textarea, [role=button i], [role=link i]"
);
static_selector!(DRAGGABLE, "[draggable=true i], [ondrag], [ondragstart], [ondrop]");

const RULE_ID: &str = "2.1.1-keyboard-access";

/// In the order the fix prefers them as the action to mirror.
const MOUSE_EVENTS: &[&str] = &["onclick", "onmousedown", "onmouseup", "ondblclick", "onmouseover"];
const KEYBOARD_EVENTS: &[&str] = &["onkeydown", "onkeyup", "onkeypress"];
const NATIVELY_FOCUSABLE: &[&str] = &["a", "button", "input", "select", "textarea", "option", "summary"];

pub struct KeyboardAccessibilityRule;

impl Rule for KeyboardAccessibilityRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "All functionality must be operable from the keyboard"
    }

    fn criterion(&self) -> &str {
        "2.1.1 Keyboard"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();

        for element in document.select(&MOUSE_HANDLERS) {
            if document.is_tag(element, NATIVELY_FOCUSABLE) || has_keyboard_handler(document, element) {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "mouse-only-handler",
                    document,
                    element,
                    Severity::Critical,
                    "Element responds to the mouse but has no keyboard equivalent",
                )
                .with_remediation("Use a <button>, or add a key handler, tabindex=\"0\" and a role")
                .fixable(),
            );
        }

        for element in document.select(&TABINDEXED) {
            match tabindex(document, element) {
                Some(value) if value > 0 => violations.push(
                    Violation::new(
                        RULE_ID,
                        "positive-tabindex",
                        document,
                        element,
                        Severity::Serious,
                        format!("Positive tabindex ({value}) overrides the natural focus order"),
                    )
                    .with_remediation("Use tabindex=\"0\" and order the markup instead")
                    .fixable(),
                ),
                Some(value) if value < 0 && INTERACTIVE.matches(document, element) => violations.push(
                    Violation::new(
                        RULE_ID,
                        "interactive-not-focusable",
                        document,
                        element,
                        Severity::Critical,
                        "Interactive element is removed from the keyboard focus order",
                    )
                    .with_remediation("Remove the negative tabindex or set it to 0")
                    .fixable(),
                ),
                _ => {}
            }
        }

        for element in document.select(&DRAGGABLE) {
            let mentions_keyboard = document.outer_html(element).to_lowercase().contains("keyboard");
            if !mentions_keyboard && !has_keyboard_handler(document, element) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "drag-without-keyboard",
                        document,
                        element,
                        Severity::Serious,
                        "Drag-and-drop interaction has no keyboard alternative",
                    )
                    .with_remediation("Provide buttons or key commands that perform the same move"),
                );
            }
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;

        for element in fix_targets(document, violations, "mouse-only-handler") {
            if has_keyboard_handler(document, element) {
                continue;
            }
            let Some(action) = MOUSE_EVENTS
                .iter()
                .find_map(|event| document.non_empty_attr(element, event))
                .map(str::to_string)
            else {
                continue;
            };

            let handler = format!("if (event.key === 'Enter') {{ {action} }}");
            document.set_attr(element, "onkeydown", &handler);
            if !document.has_attr(element, "tabindex") {
                document.set_attr(element, "tabindex", "0");
            }
            if document.is_tag(element, &["div", "span"]) && !document.has_attr(element, "role") {
                document.set_attr(element, "role", "button");
            }
            fixed += 1;
        }

        for element in fix_targets(document, violations, "positive-tabindex") {
            if tabindex(document, element).is_some_and(|value| value > 0) {
                document.set_attr(element, "tabindex", "0");
                fixed += 1;
            }
        }

        for element in fix_targets(document, violations, "interactive-not-focusable") {
            if tabindex(document, element).is_some_and(|value| value < 0) {
                document.set_attr(element, "tabindex", "0");
                fixed += 1;
            }
        }

        Ok(fixed)
    }
}

fn has_keyboard_handler(document: &Document, element: NodeId) -> bool {
    KEYBOARD_EVENTS
        .iter()
        .any(|event| document.has_attr(element, event))
}

/// Parsed `tabindex`; `None` when absent or not an integer.
pub(crate) fn tabindex(document: &Document, element: NodeId) -> Option<i32> {
    document.attr(element, "tabindex")?.trim().parse().ok()
}
