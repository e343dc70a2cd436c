//! WCAG 1.4.3 Contrast (Minimum) (Level AA)
//!
//! Only inline `style` declarations are inspected. Thresholds:
//! - 4.5:1 for normal text and form controls
//! - 3:1 for large text (24px, or 18.5px when bold)

use anyhow::Result;
use std::collections::BTreeSet;

use super::{fix_targets, Rule};
use crate::color::{contrast_ratio, LARGE_TEXT_MIN_RATIO, NORMAL_TEXT_MIN_RATIO};
use crate::dom::{Document, NodeId};
use crate::style::{hidden_elements, set_style_property, InlineStyle};
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(TEXT_ELEMENTS, "p, h1, h2, h3, h4, h5, h6, span, div, a, button, label, li");
static_selector!(FORM_CONTROLS, "input, select, textarea, button");
static_selector!(ICONS, "i, svg, img, [class*=icon i]");

const RULE_ID: &str = "1.4.3-color-contrast";

const ALERT_CLASSES: &[&str] = &[
    "text-danger",
    "text-warning",
    "text-success",
    "text-info",
    "red",
    "green",
    "blue",
];

const ALERT_COLORS: &[&str] = &["red", "green", "blue"];

const LARGE_TEXT_CLASSES: &[&str] = &[
    "display-1",
    "display-2",
    "display-3",
    "display-4",
    "large",
    "x-large",
    "xx-large",
];

pub struct ColorContrastRule;

impl Rule for ColorContrastRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "Text must have sufficient contrast against its background"
    }

    fn criterion(&self) -> &str {
        "1.4.3 Contrast (Minimum)"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::AA
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        let mut checked = BTreeSet::new();
        let hidden = hidden_elements(document);
        let with_text = document.elements_with_text();

        for element in document.select(&TEXT_ELEMENTS) {
            if !with_text.contains(&element) || hidden.contains(&element) {
                continue;
            }
            checked.insert(element);
            let style = InlineStyle::of(document, element);
            let minimum = required_ratio(document, element, &style);

            match (style.foreground(), style.background()) {
                (Some(fg), Some(bg)) => {
                    let ratio = contrast_ratio(fg, bg);
                    if ratio < minimum {
                        violations.push(insufficient(document, element, ratio, minimum));
                    }
                }
                (Some(fg), None) if fg.is_light() && !has_background_context(document, element) => {
                    violations.push(
                        Violation::new(
                            RULE_ID,
                            "light-text-no-background",
                            document,
                            element,
                            Severity::Moderate,
                            "Light text color without a specified background may have contrast issues",
                        )
                        .with_remediation("Declare a background color that contrasts with the text")
                        .fixable(),
                    );
                }
                _ => {}
            }

            if conveys_meaning_by_color_only(document, element, &style) {
                violations.push(
                    Violation::new(
                        RULE_ID,
                        "color-only",
                        document,
                        element,
                        Severity::Moderate,
                        "Information appears to be conveyed by color alone",
                    )
                    .with_remediation("Add text, an icon, or an aria-label that carries the same meaning"),
                );
            }
        }

        for control in document.select(&FORM_CONTROLS) {
            if checked.contains(&control) || hidden.contains(&control) {
                continue;
            }
            let style = InlineStyle::of(document, control);
            if let (Some(fg), Some(bg)) = (style.foreground(), style.background()) {
                let ratio = contrast_ratio(fg, bg);
                if ratio < NORMAL_TEXT_MIN_RATIO {
                    violations.push(insufficient(document, control, ratio, NORMAL_TEXT_MIN_RATIO));
                }
            }
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;

        for element in fix_targets(document, violations, "insufficient-contrast") {
            let style = InlineStyle::of(document, element);
            let minimum = required_ratio(document, element, &style);
            if let (Some(fg), Some(bg)) = (style.foreground(), style.background()) {
                if contrast_ratio(fg, bg) < minimum {
                    set_style_property(document, element, "color", &bg.best_extreme().to_hex());
                    fixed += 1;
                }
            }
        }

        for element in fix_targets(document, violations, "light-text-no-background") {
            let style = InlineStyle::of(document, element);
            match style.foreground() {
                Some(fg) if style.background().is_none() && !has_background_context(document, element) => {
                    set_style_property(document, element, "background-color", &fg.best_extreme().to_hex());
                    fixed += 1;
                }
                _ => {}
            }
        }

        Ok(fixed)
    }
}

fn insufficient(document: &Document, element: NodeId, ratio: f64, minimum: f64) -> Violation {
    Violation::new(
        RULE_ID,
        "insufficient-contrast",
        document,
        element,
        Severity::Serious,
        format!("Insufficient color contrast ratio: {ratio:.2}:1 (minimum should be {minimum:.1}:1)"),
    )
    .with_remediation("Darken the text or lighten the background until the ratio is met")
    .fixable()
}

fn required_ratio(document: &Document, element: NodeId, style: &InlineStyle) -> f64 {
    if document.is_tag(element, &["input", "select", "textarea"]) {
        return NORMAL_TEXT_MIN_RATIO;
    }
    if is_large_text(document, element, style) {
        LARGE_TEXT_MIN_RATIO
    } else {
        NORMAL_TEXT_MIN_RATIO
    }
}

pub fn is_large_text(document: &Document, element: NodeId, style: &InlineStyle) -> bool {
    if document.is_tag(element, &["h1", "h2"]) {
        return true;
    }
    if LARGE_TEXT_CLASSES.iter().any(|c| document.has_class(element, c)) {
        return true;
    }

    let bold = style.get("font-weight").is_some_and(|weight| {
        let weight = weight.to_ascii_lowercase();
        weight == "bold" || weight == "bolder" || weight.parse::<u32>().is_ok_and(|w| w >= 700)
    });

    match style.get("font-size").and_then(font_size_px) {
        Some(px) => px >= 24.0 || (bold && px >= 18.5),
        None => false,
    }
}

/// CSS font size converted to pixels, assuming a 16px root.
fn font_size_px(value: &str) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let keyword = match value.as_str() {
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "xxx-large" => Some(48.0),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }

    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;
    match unit.trim() {
        "px" | "" => Some(number),
        "pt" => Some(number * 4.0 / 3.0),
        "em" | "rem" => Some(number * 16.0),
        "%" => Some(number / 100.0 * 16.0),
        _ => None,
    }
}

/// A background on the element or an ancestor, inline or via a `bg-*` class.
fn has_background_context(document: &Document, element: NodeId) -> bool {
    std::iter::once(element)
        .chain(document.ancestors(element))
        .any(|node| {
            InlineStyle::of(document, node).declares_background()
                || document
                    .element(node)
                    .is_some_and(|el| el.classes().any(|c| c.starts_with("bg-")))
        })
}

fn conveys_meaning_by_color_only(document: &Document, element: NodeId, style: &InlineStyle) -> bool {
    let alert_class = ALERT_CLASSES.iter().any(|c| document.has_class(element, c));
    let alert_color = style
        .get("color")
        .is_some_and(|color| ALERT_COLORS.contains(&color.to_ascii_lowercase().as_str()));
    if !alert_class && !alert_color {
        return false;
    }

    let text = document.text(element);
    let has_indicator = document.non_empty_attr(element, "aria-label").is_some()
        || document.non_empty_attr(element, "title").is_some()
        || text.contains('*')
        || text.contains('!')
        || !document.select_within(element, &ICONS).is_empty();
    !has_indicator
}
