//! WCAG 1.3.1 Info and Relationships (Level A): form controls need a label.

use anyhow::Result;
use std::collections::HashSet;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::style::hidden_elements;
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(
    FORM_CONTROLS,
    "input:not([type=button]):not([type=submit]):not([type=reset]):not([type=hidden]):not([type=image]), select, textarea"
);

const RULE_ID: &str = "1.3.1-form-label";

pub struct FormLabelRule;

impl Rule for FormLabelRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Form controls must have an accessible label"
    }

    fn criterion(&self) -> &str {
        "1.3.1 Info and Relationships"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let hidden = hidden_elements(document);
        let labels = LabelIndex::build(document);
        let violations = document
            .select(&FORM_CONTROLS)
            .into_iter()
            .filter(|control| !hidden.contains(control))
            .filter(|control| !labels.is_labelled(document, *control))
            .map(|control| {
                Violation::new(
                    RULE_ID,
                    "missing-label",
                    document,
                    control,
                    Severity::Critical,
                    format!("{} lacks an accessible label", control_kind(document, control)),
                )
                .with_remediation(
                    "Associate a <label for=\"...\"> with the control, or add aria-label / aria-labelledby",
                )
                .fixable()
            })
            .collect();
        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;
        let mut labels = LabelIndex::build(document);
        for control in fix_targets(document, violations, "missing-label") {
            if labels.is_labelled(document, control) {
                continue;
            }

            let id = match document.non_empty_attr(control, "id") {
                Some(id) => id.to_string(),
                None => {
                    let id = unique_id(document, control, &labels.ids);
                    document.set_attr(control, "id", &id);
                    labels.ids.insert(id.clone());
                    id
                }
            };

            let text = label_text(document, control);
            let label = document.create_element("label", &[("for", id.as_str())]);
            let content = document.create_text(&text);
            document.append_child(label, content);
            document.insert_before(control, label);
            labels.label_targets.insert(id);
            fixed += 1;
        }
        Ok(fixed)
    }
}

/// `<label for>` targets and element ids, gathered once per pass.
pub struct LabelIndex {
    label_targets: HashSet<String>,
    ids: HashSet<String>,
}

impl LabelIndex {
    pub fn build(document: &Document) -> Self {
        let mut label_targets = HashSet::new();
        let mut ids = HashSet::new();
        for element in document.elements() {
            if let Some(id) = document.attr(element, "id") {
                ids.insert(id.to_string());
            }
            if document.tag(element) == Some("label") {
                if let Some(target) = document.attr(element, "for") {
                    label_targets.insert(target.trim().to_string());
                }
            }
        }
        Self { label_targets, ids }
    }

    /// Label sources, in priority order: `<label for>`, aria-label,
    /// aria-labelledby pointing at an existing element, title, placeholder,
    /// wrapping `<label>`.
    pub fn is_labelled(&self, document: &Document, control: NodeId) -> bool {
        if document
            .non_empty_attr(control, "id")
            .is_some_and(|id| self.label_targets.contains(id))
        {
            return true;
        }

        if document.non_empty_attr(control, "aria-label").is_some() {
            return true;
        }

        if let Some(ids) = document.non_empty_attr(control, "aria-labelledby") {
            if ids.split_ascii_whitespace().any(|id| self.ids.contains(id)) {
                return true;
            }
        }

        if document.non_empty_attr(control, "title").is_some()
            || document.non_empty_attr(control, "placeholder").is_some()
        {
            return true;
        }

        document
            .ancestors(control)
            .any(|ancestor| document.tag(ancestor) == Some("label"))
    }
}

/// One-off check; build a [`LabelIndex`] when checking many controls.
pub fn has_accessible_label(document: &Document, control: NodeId) -> bool {
    LabelIndex::build(document).is_labelled(document, control)
}

fn input_type(document: &Document, control: NodeId) -> String {
    document
        .non_empty_attr(control, "type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

fn control_kind(document: &Document, control: NodeId) -> String {
    match document.tag(control) {
        Some("select") => "Select element".to_string(),
        Some("textarea") => "Textarea".to_string(),
        _ => {
            let kind = input_type(document, control);
            let mut chars = kind.chars();
            let kind: String = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => kind,
            };
            format!("{kind} input")
        }
    }
}

/// Visible label text for a synthesised `<label>`.
pub fn label_text(document: &Document, control: NodeId) -> String {
    if let Some(placeholder) = document.non_empty_attr(control, "placeholder") {
        return placeholder.to_string();
    }
    if let Some(name) = document.non_empty_attr(control, "name") {
        let words = humanize(name);
        if !words.is_empty() {
            return format!("{words}:");
        }
    }

    match document.tag(control) {
        Some("select") => "Select:".to_string(),
        Some("textarea") => "Comments:".to_string(),
        Some("input") => match input_type(document, control).as_str() {
            "text" => "Text:",
            "email" => "Email:",
            "password" => "Password:",
            "tel" => "Phone:",
            "url" => "Website:",
            "date" => "Date:",
            "time" => "Time:",
            "number" => "Number:",
            "search" => "Search:",
            "checkbox" => "Checkbox label",
            "radio" => "Radio option",
            _ => "Input:",
        }
        .to_string(),
        _ => "[Label needed]".to_string(),
    }
}

/// `first_name`, `first-name` and `firstName` all become "First Name".
pub fn humanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == '.' || c == '[' || c == ']' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// An id not yet used in the document, derived from the control's name.
fn unique_id(document: &Document, control: NodeId, taken: &HashSet<String>) -> String {
    let base: String = document
        .non_empty_attr(control, "name")
        .map(|name| {
            name.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
                .collect()
        })
        .unwrap_or_else(|| document.tag(control).unwrap_or("field").to_string());

    let mut candidate = format!("a11y-{base}-{}", control.index());
    let mut suffix = 1;
    while taken.contains(&candidate) {
        candidate = format!("a11y-{base}-{}-{suffix}", control.index());
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(markup: &str) -> Vec<Violation> {
        FormLabelRule.evaluate(&Document::parse(markup)).unwrap()
    }

    #[test]
    fn test_each_label_source_counts() {
        let markup = r#"
            <label for="a">A</label><input id="a">
            <input aria-label="B">
            <span id="c-label">C</span><input aria-labelledby="c-label">
            <input title="D">
            <input placeholder="E">
            <label>F <input></label>
            <input type="submit"><input type="hidden" name="token">
        "#;
        assert!(evaluate(markup).is_empty());
    }

    #[test]
    fn test_unlabelled_controls() {
        let violations = evaluate(
            r#"<input type="email" name="email"><select name="country"></select><textarea></textarea><input aria-labelledby="missing">"#,
        );
        let messages: Vec<_> = violations.iter().map(|v| v.message().to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "Email input lacks an accessible label",
                "Select element lacks an accessible label",
                "Textarea lacks an accessible label",
                "Text input lacks an accessible label",
            ]
        );
        assert!(violations.iter().all(|v| v.severity() == Severity::Critical));
    }

    #[test]
    fn test_hidden_controls_skipped() {
        assert!(evaluate(r#"<div style="display: none"><input name="q"></div>"#).is_empty());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("first_name"), "First Name");
        assert_eq!(humanize("billing-address"), "Billing Address");
        assert_eq!(humanize("phoneNumber"), "Phone Number");
        assert_eq!(humanize("user[email]"), "User Email");
    }

    #[test]
    fn test_fix_inserts_label_before_control() {
        let doc = Document::parse(r#"<form><input type="text" name="first_name"><input type="tel" id="phone"></form>"#);
        let violations = FormLabelRule.evaluate(&doc).unwrap();
        assert_eq!(violations.len(), 2);

        let mut working = doc.clone();
        assert_eq!(FormLabelRule.apply_fixes(&mut working, &violations).unwrap(), 2);
        assert_eq!(FormLabelRule.apply_fixes(&mut working, &violations).unwrap(), 0);
        assert!(FormLabelRule.evaluate(&working).unwrap().is_empty());

        let html = working.to_html();
        assert!(html.contains(r#"<label for="phone">Phone:</label><input type="tel" id="phone">"#));
        let first = working.first_element_by_tag("input").unwrap();
        let id = working.attr(first, "id").unwrap().to_string();
        assert!(id.starts_with("a11y-first-name-"));
        assert!(html.contains(&format!(r#"<label for="{id}">First Name:</label>"#)));
    }

    #[test]
    fn test_fix_tracks_labels_added_in_the_same_pass() {
        let doc = Document::parse(r#"<input id="dup" name="a"><input id="dup" name="b"><input name="c"><input name="c">"#);
        let violations = FormLabelRule.evaluate(&doc).unwrap();
        assert_eq!(violations.len(), 4);

        let mut working = doc.clone();
        assert_eq!(FormLabelRule.apply_fixes(&mut working, &violations).unwrap(), 3);
        assert_eq!(working.elements_by_tag("label").len(), 3);

        let generated: Vec<String> = working
            .elements_by_tag("input")
            .into_iter()
            .filter_map(|input| working.attr(input, "id").map(str::to_string))
            .filter(|id| id.starts_with("a11y-"))
            .collect();
        assert_eq!(generated.len(), 2);
        assert_ne!(generated[0], generated[1]);

        let inputs = working.elements_by_tag("input");
        assert!(inputs.iter().all(|input| has_accessible_label(&working, *input)));
    }
}
