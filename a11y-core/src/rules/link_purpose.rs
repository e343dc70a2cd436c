//! WCAG 2.4.4 Link Purpose (In Context) (Level A)

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::style::hidden_elements;
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(LINKS, "a[href]");

const RULE_ID: &str = "2.4.4-link-purpose";

/// Appended to links that open a new browsing context.
pub const NEW_WINDOW_NOTICE: &str = "(opens in a new window)";

/// Link names that say nothing about the destination.
const GENERIC_LINK_TEXT: &[&str] = &[
    "click here",
    "click",
    "here",
    "more",
    "read more",
    "details",
    "learn more",
    "this page",
    "this link",
    "this",
    "link",
    "go",
    "go to",
    "navigate",
    "open",
    "show",
    "view",
    "see",
    "check",
    "check this out",
    "check it out",
    "visit",
    "visit this",
    "right here",
    "see here",
    "see this",
    "view this",
    "page",
    "website",
    "web page",
    "site",
    "information",
    "info",
];

/// Phrases that are generic when followed by " to ..." or " for ...".
const GENERIC_LEADS: &[&str] = &["click here", "click", "here", "link"];

pub struct LinkPurposeRule;

impl Rule for LinkPurposeRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Link text must describe the link's purpose"
    }

    fn criterion(&self) -> &str {
        "2.4.4 Link Purpose (In Context)"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let hidden = hidden_elements(document);
        let links: Vec<NodeId> = document
            .select(&LINKS)
            .into_iter()
            .filter(|link| !hidden.contains(link) && document.attr(*link, "aria-hidden") != Some("true"))
            .collect();

        let mut violations = Vec::new();
        let mut by_destination: BTreeMap<String, Vec<(NodeId, String)>> = BTreeMap::new();

        for &link in &links {
            let name = accessible_name(document, link);
            let lowered = name.to_lowercase();

            if name.is_empty() {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "empty-link",
                        document,
                        link,
                        Severity::Critical,
                        "Link has no accessible name",
                    )
                    .with_remediation("Add link text, an aria-label, or alt text on the linked image"),
                );
            } else if is_generic_name(&lowered) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "generic-text",
                        document,
                        link,
                        Severity::Moderate,
                        format!("Link text \"{name}\" does not describe its destination"),
                    )
                    .with_remediation("Use link text that makes sense out of context"),
                );
            } else if is_url(&lowered) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "url-as-text",
                        document,
                        link,
                        Severity::Moderate,
                        "Link text is a raw URL",
                    )
                    .with_remediation("Replace the URL with a description of the destination"),
                );
            }

            if opens_new_window(document, link) && !announces_new_window(&lowered) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "new-window-unannounced",
                        document,
                        link,
                        Severity::Moderate,
                        "Link opens a new window without telling the user",
                    )
                    .with_remediation(format!("Add \"{NEW_WINDOW_NOTICE}\" to the link's accessible name"))
                    .fixable(),
                );
            }

            if let Some(href) = comparable_href(document, link) {
                by_destination.entry(href).or_default().push((link, lowered));
            }
        }

        // Same destination, different names. Groups are visited in document order.
        let mut groups: Vec<&Vec<(NodeId, String)>> = by_destination.values().collect();
        groups.sort_by_key(|group| group[0].0);
        for group in groups {
            let names: BTreeSet<&str> = group.iter().map(|(_, name)| name.as_str()).collect();
            if names.len() < 2 {
                continue;
            }
            for (link, _) in group {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "inconsistent-names",
                        document,
                        *link,
                        Severity::Minor,
                        "Links to the same destination use different text",
                    )
                    .with_remediation("Use the same text for links that go to the same place"),
                );
            }
        }

        violations.extend(adjacent_link_conflicts(document, &links));
        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;
        for link in fix_targets(document, violations, "new-window-unannounced") {
            if !opens_new_window(document, link)
                || announces_new_window(&accessible_name(document, link).to_lowercase())
            {
                continue;
            }

            // Augment whichever attribute currently supplies the name.
            if let Some(label) = document.non_empty_attr(link, "aria-label") {
                let label = format!("{label} {NEW_WINDOW_NOTICE}");
                document.set_attr(link, "aria-label", &label);
            } else {
                let base = document
                    .non_empty_attr(link, "title")
                    .map(str::to_string)
                    .unwrap_or_else(|| document.text(link));
                let title = if base.is_empty() {
                    NEW_WINDOW_NOTICE.to_string()
                } else {
                    format!("{base} {NEW_WINDOW_NOTICE}")
                };
                document.set_attr(link, "title", &title);
            }

            let has_notice = document.descendant_elements(link).into_iter().any(|el| {
                document.has_class(el, "sr-only") && document.text(el) == NEW_WINDOW_NOTICE
            });
            if !has_notice {
                let span = document.create_element("span", &[("class", "sr-only")]);
                let text = document.create_text(NEW_WINDOW_NOTICE);
                document.append_child(span, text);
                document.append_child(link, span);
            }
            fixed += 1;
        }
        Ok(fixed)
    }
}

/// aria-label, then title, then text content, then alt of a contained image.
pub fn accessible_name(document: &Document, link: NodeId) -> String {
    if let Some(label) = document.non_empty_attr(link, "aria-label") {
        return label.to_string();
    }
    if let Some(title) = document.non_empty_attr(link, "title") {
        return title.to_string();
    }
    let text = document.text(link);
    if !text.is_empty() {
        return text;
    }
    document
        .descendant_elements(link)
        .into_iter()
        .filter(|el| document.tag(*el) == Some("img"))
        .find_map(|img| document.non_empty_attr(img, "alt").map(str::to_string))
        .unwrap_or_default()
}

fn is_generic_name(lowered: &str) -> bool {
    let trimmed = lowered.trim_end_matches(['.', '!', '…', ':']).trim();
    GENERIC_LINK_TEXT.contains(&trimmed)
        || GENERIC_LEADS.iter().any(|lead| {
            trimmed.starts_with(&format!("{lead} to ")) || trimmed.starts_with(&format!("{lead} for "))
        })
}

fn is_url(lowered: &str) -> bool {
    lowered.starts_with("http://") || lowered.starts_with("https://") || lowered.starts_with("www.")
}

fn opens_new_window(document: &Document, link: NodeId) -> bool {
    document
        .attr(link, "target")
        .is_some_and(|target| target.trim().eq_ignore_ascii_case("_blank"))
}

fn announces_new_window(lowered: &str) -> bool {
    lowered.contains("new window") || lowered.contains("new tab")
}

/// Destination used to group links; in-page and script links are not compared.
fn comparable_href(document: &Document, link: NodeId) -> Option<String> {
    let href = document.attr(link, "href")?.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    Some(href.to_string())
}

/// Consecutive sibling links with the same name but different targets,
/// reported once per parent.
fn adjacent_link_conflicts(document: &Document, links: &[NodeId]) -> Vec<Violation> {
    let mut seen = BTreeSet::new();
    let parents: Vec<NodeId> = links
        .iter()
        .filter_map(|link| document.parent_element(*link))
        .filter(|parent| seen.insert(*parent))
        .collect();

    let mut violations = Vec::new();
    for parent in parents {
        let siblings = document.element_children(parent);
        let conflict = siblings.windows(2).any(|pair| {
            let (a, b) = (pair[0], pair[1]);
            if !links.contains(&a) || !links.contains(&b) {
                return false;
            }
            let name_a = accessible_name(document, a).to_lowercase();
            let name_b = accessible_name(document, b).to_lowercase();
            !name_a.is_empty() && name_a == name_b && document.attr(a, "href") != document.attr(b, "href")
        });
        if conflict {
            violations.push(
                Violation::new(
                    RULE_ID,
                    "ambiguous-adjacent",
                    document,
                    parent,
                    Severity::Moderate,
                    "Adjacent links share the same text but lead to different destinations",
                )
                .with_remediation("Give each link text that distinguishes its destination"),
            );
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(markup: &str) -> Vec<String> {
        LinkPurposeRule
            .evaluate(&Document::parse(markup))
            .unwrap()
            .iter()
            .map(|v| v.check().to_string())
            .collect()
    }

    #[test]
    fn test_descriptive_links_pass() {
        assert!(checks(r#"<a href="/pricing">View pricing plans</a><a href="/about" aria-label="About the company">About</a>"#).is_empty());
    }

    #[test]
    fn test_empty_and_image_links() {
        assert_eq!(checks(r#"<a href="/x"></a>"#), vec!["empty-link"]);
        assert!(checks(r#"<a href="/"><img src="logo.png" alt="Acme home page"></a>"#).is_empty());
    }

    #[test]
    fn test_generic_and_url_text() {
        assert_eq!(
            checks(r#"<p><a href="/a">Read more</a></p><p><a href="/b">Click here to download</a></p><p><a href="/c">https://example.com</a></p>"#),
            vec!["generic-text", "generic-text", "url-as-text"]
        );
    }

    #[test]
    fn test_hidden_links_are_ignored() {
        assert!(checks(r#"<a href="/x" aria-hidden="true">here</a><div hidden><a href="/y"></a></div>"#).is_empty());
    }

    #[test]
    fn test_same_destination_different_names() {
        assert_eq!(
            checks(r##"<p><a href="/docs">Documentation</a></p><p><a href="/docs">User guide</a></p><a href="#">Top</a><a href="#">Back to top</a>"##),
            vec!["inconsistent-names", "inconsistent-names"]
        );
    }

    #[test]
    fn test_adjacent_links_with_same_name() {
        assert_eq!(
            checks(r#"<nav><a href="/a">Download report</a><a href="/b">Download report</a></nav>"#),
            vec!["ambiguous-adjacent"]
        );
    }

    #[test]
    fn test_new_window_fix_is_idempotent() {
        let doc = Document::parse(r#"<a href="/doc.pdf" target="_blank">Annual report</a>"#);
        let violations = LinkPurposeRule.evaluate(&doc).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].is_auto_fixable());

        let mut working = doc.clone();
        assert_eq!(LinkPurposeRule.apply_fixes(&mut working, &violations).unwrap(), 1);
        assert_eq!(LinkPurposeRule.apply_fixes(&mut working, &violations).unwrap(), 0);
        assert!(LinkPurposeRule.evaluate(&working).unwrap().is_empty());

        let link = working.first_element_by_tag("a").unwrap();
        assert_eq!(working.attr(link, "title"), Some("Annual report (opens in a new window)"));
        assert_eq!(working.elements_by_tag("span").len(), 1);
    }

    #[test]
    fn test_new_window_fix_extends_aria_label() {
        let doc = Document::parse(r#"<a href="/x" target="_blank" aria-label="Pricing sheet">Pricing</a>"#);
        let violations = LinkPurposeRule.evaluate(&doc).unwrap();
        let mut working = doc.clone();
        LinkPurposeRule.apply_fixes(&mut working, &violations).unwrap();
        let link = working.first_element_by_tag("a").unwrap();
        assert_eq!(working.attr(link, "aria-label"), Some("Pricing sheet (opens in a new window)"));
        assert!(LinkPurposeRule.evaluate(&working).unwrap().is_empty());
    }
}
