//! WCAG 1.3.1 Info and Relationships (Level A): heading outline.
//!
//! The outline must start at H1, contain a single H1, and never jump more
//! than one level deeper than the previous heading.

use anyhow::Result;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, Severity, Violation};

const RULE_ID: &str = "1.3.1-heading-structure";

const FIXABLE_CHECKS: &[&str] = &["first-heading-not-h1", "multiple-h1", "skipped-level"];

pub struct HeadingStructureRule;

impl Rule for HeadingStructureRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Headings must form a logical outline"
    }

    fn criterion(&self) -> &str {
        "1.3.1 Info and Relationships"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let headings = headings(document);
        let mut violations = Vec::new();

        if headings.is_empty() {
            if let Some(anchor) = document.body().or_else(|| document.html_element()) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "no-headings",
                        document,
                        anchor,
                        Severity::Serious,
                        "Page does not contain any headings",
                    )
                    .with_remediation("Structure the content with headings, starting with an H1"),
                );
            }
            return Ok(violations);
        }

        let mut seen_h1 = false;
        let mut previous: Option<u8> = None;

        for (index, (heading, level)) in headings.iter().copied().enumerate() {
            if index == 0 && level != 1 {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "first-heading-not-h1",
                        document,
                        heading,
                        Severity::Moderate,
                        format!("First heading on page is H{level}, should be H1"),
                    )
                    .with_remediation("Start the page outline with an H1")
                    .fixable(),
                );
            }

            if level == 1 && seen_h1 {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "multiple-h1",
                        document,
                        heading,
                        Severity::Moderate,
                        "Page contains more than one H1 heading",
                    )
                    .with_remediation("Keep a single H1 and demote the others")
                    .fixable(),
                );
            }

            if let Some(prev) = previous {
                if level > prev + 1 {
                    violations.push(
                        Violation::new(
                            RULE_ID,
                            "skipped-level",
                            document,
                            heading,
                            Severity::Moderate,
                            format!("Heading level skipped from H{prev} to H{level}"),
                        )
                        .with_remediation(format!("Use H{} here or add the missing level", prev + 1))
                        .fixable(),
                    );
                }
            }

            if is_empty_heading(document, heading) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "empty-heading",
                        document,
                        heading,
                        Severity::Serious,
                        format!("H{level} heading is empty"),
                    )
                    .with_remediation("Give the heading text or remove it"),
                );
            }

            seen_h1 |= level == 1;
            previous = Some(level);
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    /// Repairs the outline as a whole: promoting the first heading or
    /// demoting an extra H1 can open a new gap further down, so every
    /// heading is re-levelled against its already-repaired predecessor.
    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let requested = FIXABLE_CHECKS
            .iter()
            .any(|check| !fix_targets(document, violations, check).is_empty());
        if !requested {
            return Ok(0);
        }

        let mut fixed = 0;
        let mut seen_h1 = false;
        let mut previous: Option<u8> = None;

        for (heading, level) in headings(document) {
            let target = match previous {
                None => 1,
                Some(prev) => {
                    let mut target = level;
                    if target == 1 && seen_h1 {
                        target = 2;
                    }
                    target.min(prev + 1)
                }
            };

            if target != level {
                document.rename(heading, &format!("h{target}"));
                fixed += 1;
            }
            seen_h1 |= target == 1;
            previous = Some(target);
        }

        Ok(fixed)
    }
}

/// `h1`..`h6` elements with their level, in document order.
fn headings(document: &Document) -> Vec<(NodeId, u8)> {
    document
        .elements()
        .into_iter()
        .filter_map(|id| heading_level(document.tag(id)?).map(|level| (id, level)))
        .collect()
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn is_empty_heading(document: &Document, heading: NodeId) -> bool {
    document.text(heading).is_empty()
        && !document
            .descendant_elements(heading)
            .into_iter()
            .any(|el| document.tag(el) == Some("img") && document.non_empty_attr(el, "alt").is_some())
}
