//! Remediation passes that are not tied to a detected violation.
//!
//! Both implement [`Rule`] so the remediation engine can run them through the
//! same isolated fix loop as the criteria. Their `evaluate` reports nothing and
//! their `apply_fixes` ignores the violation list.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::Rule;
use crate::dom::{Document, NodeId, Selector};
use crate::types::{ComplianceLevel, Violation};

pub const ARIA_PASS_ID: &str = "aria-enhancements";
pub const CONTRAST_PASS_ID: &str = "contrast-enhancements";
pub const CONTRAST_STYLE_ID: &str = "a11y-contrast-enhancements";

static_selector!(
    REQUIRED_FIELDS,
    "input[required], select[required], textarea[required]"
);
static_selector!(DROPDOWN_TOGGLES, "[data-toggle=dropdown i], .dropdown-toggle");

/// Containers a page-level banner or footer must not be nested in.
const SECTIONING: &[&str] = &["article", "section", "aside", "nav", "main"];

struct Landmark {
    role: &'static str,
    selector: Selector,
    /// At most one per page.
    unique: bool,
    /// Skip candidates nested in sectioning content.
    top_level: bool,
}

static LANDMARKS: LazyLock<Vec<Landmark>> = LazyLock::new(|| {
    [
        ("main", "main, #main, #main-content, .main-content", true, false),
        ("navigation", "nav, .navbar, #navigation, .navigation", false, false),
        ("search", "form.search, form.search-form, form#search, form[action*=search i]", false, false),
        ("banner", "header, #header, .site-header", true, true),
        ("contentinfo", "footer, #footer, .site-footer", true, true),
        ("complementary", "aside, div.sidebar, #sidebar", false, false),
    ]
    .into_iter()
    .map(|(role, source, unique, top_level)| Landmark {
        role,
        selector: Selector::parse(source).expect("valid selector"),
        unique,
        top_level,
    })
    .collect()
});

const BASELINE_CSS: &str = "\
/* Accessibility contrast enhancements */
a:focus, button:focus, input:focus, select:focus, textarea:focus { outline: 2px solid #005fcc; outline-offset: 2px; }
.sr-only { position: absolute; width: 1px; height: 1px; padding: 0; margin: -1px; overflow: hidden; clip: rect(0, 0, 0, 0); white-space: nowrap; border: 0; }
@media (prefers-contrast: more) { body { color: #000000; background-color: #ffffff; } a { color: #0000ee; } }
";

// ===== ARIA PASS =====

/// Landmark roles, `aria-required`, dropdown state and the page language.
pub struct AriaEnhancementPass {
    default_language: String,
}

impl AriaEnhancementPass {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }

    fn add_landmarks(&self, document: &mut Document) -> usize {
        let mut added = 0;
        for landmark in LANDMARKS.iter() {
            let present = document
                .elements()
                .into_iter()
                .any(|el| has_role(document, el, landmark.role));
            if landmark.unique && present {
                continue;
            }

            for element in document.select(&landmark.selector) {
                if document.has_attr(element, "role") {
                    continue;
                }
                if landmark.top_level
                    && document
                        .ancestors(element)
                        .any(|ancestor| document.is_tag(ancestor, SECTIONING))
                {
                    continue;
                }
                document.set_attr(element, "role", landmark.role);
                added += 1;
                if landmark.unique {
                    break;
                }
            }
        }
        added
    }
}

impl Rule for AriaEnhancementPass {
    fn id(&self) -> &str {
        ARIA_PASS_ID
    }

    fn description(&self) -> &str {
        "Landmark roles and ARIA state for assistive technology"
    }

    fn criterion(&self) -> &str {
        "4.1.2 Name, Role, Value"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, _document: &Document) -> Result<Vec<Violation>> {
        Ok(Vec::new())
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, _violations: &[Violation]) -> Result<usize> {
        let mut fixed = self.add_landmarks(document);

        for field in document.select(&REQUIRED_FIELDS) {
            if !document.has_attr(field, "aria-required") {
                document.set_attr(field, "aria-required", "true");
                fixed += 1;
            }
        }

        for toggle in document.select(&DROPDOWN_TOGGLES) {
            if !document.has_attr(toggle, "aria-expanded") {
                document.set_attr(toggle, "aria-expanded", "false");
                fixed += 1;
            }
        }

        if let Some(root) = document.html_element() {
            if document.non_empty_attr(root, "lang").is_none() {
                document.set_attr(root, "lang", &self.default_language);
                fixed += 1;
            }
        }

        Ok(fixed)
    }
}

fn has_role(document: &Document, element: NodeId, role: &str) -> bool {
    document
        .attr(element, "role")
        .is_some_and(|value| value.split_whitespace().any(|r| r.eq_ignore_ascii_case(role)))
}

// ===== CONTRAST PASS =====

/// Injects one stylesheet with focus outlines, the `.sr-only` helper and the
/// configured CSS overrides.
pub struct ContrastStylePass {
    css_overrides: BTreeMap<String, String>,
}

impl ContrastStylePass {
    pub fn new(css_overrides: BTreeMap<String, String>) -> Self {
        Self { css_overrides }
    }

    fn stylesheet(&self) -> String {
        let mut css = BASELINE_CSS.to_string();
        for (selector, declarations) in &self.css_overrides {
            css.push_str(&format!("{selector} {{ {} }}\n", declarations.trim()));
        }
        css
    }
}

impl Rule for ContrastStylePass {
    fn id(&self) -> &str {
        CONTRAST_PASS_ID
    }

    fn description(&self) -> &str {
        "Baseline contrast and focus styles"
    }

    fn criterion(&self) -> &str {
        "1.4.3 Contrast (Minimum)"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::AA
    }

    fn evaluate(&self, _document: &Document) -> Result<Vec<Violation>> {
        Ok(Vec::new())
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, _violations: &[Violation]) -> Result<usize> {
        if document.element_by_id(CONTRAST_STYLE_ID).is_some() {
            return Ok(0);
        }
        let Some(head) = ensure_head(document) else {
            return Ok(0);
        };

        let style = document.create_element("style", &[("id", CONTRAST_STYLE_ID)]);
        let css = document.create_text(&self.stylesheet());
        document.append_child(style, css);
        document.append_child(head, style);

        Ok(1 + self.css_overrides.len())
    }
}

fn ensure_head(document: &mut Document) -> Option<NodeId> {
    if let Some(head) = document.head() {
        return Some(head);
    }
    let html = document.html_element()?;
    let head = document.create_element("head", &[]);
    match document.children(html).first().copied() {
        Some(first) => document.insert_before(first, head),
        None => document.append_child(html, head),
    }
    Some(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enhance(markup: &str) -> (Document, usize) {
        let mut doc = Document::parse(markup);
        let fixed = AriaEnhancementPass::new("en").apply_fixes(&mut doc, &[]).unwrap();
        (doc, fixed)
    }

    #[test]
    fn test_landmarks() {
        let (doc, fixed) = enhance(
            "<html><body><header>Site</header><nav>Links</nav><main><article><header>Post</header></article></main>\
             <aside>More</aside><footer>Fine print</footer></body></html>",
        );
        // lang plus five landmarks; the header inside the article stays unmarked.
        assert_eq!(fixed, 6);
        let headers = doc.elements_by_tag("header");
        assert_eq!(doc.attr(headers[0], "role"), Some("banner"));
        assert_eq!(doc.attr(headers[1], "role"), None);
        assert_eq!(doc.attr(doc.first_element_by_tag("main").unwrap(), "role"), Some("main"));
        assert_eq!(doc.attr(doc.first_element_by_tag("aside").unwrap(), "role"), Some("complementary"));
        assert_eq!(doc.attr(doc.first_element_by_tag("footer").unwrap(), "role"), Some("contentinfo"));
    }

    #[test]
    fn test_unique_landmark_respects_existing_role() {
        let (doc, _) = enhance(r#"<html lang="en"><body><div role="main">A</div><main>B</main></body></html>"#);
        assert_eq!(doc.attr(doc.first_element_by_tag("main").unwrap(), "role"), None);
    }

    #[test]
    fn test_form_state_and_language() {
        let (doc, fixed) = enhance(
            r##"<html><body><input required><a class="dropdown-toggle" href="#">Menu</a></body></html>"##,
        );
        assert_eq!(fixed, 3);
        assert_eq!(doc.attr(doc.first_element_by_tag("input").unwrap(), "aria-required"), Some("true"));
        assert_eq!(doc.attr(doc.first_element_by_tag("a").unwrap(), "aria-expanded"), Some("false"));
        assert_eq!(doc.attr(doc.html_element().unwrap(), "lang"), Some("en"));
    }

    #[test]
    fn test_aria_pass_is_idempotent() {
        let (mut doc, fixed) = enhance("<html><body><nav>x</nav><input required></body></html>");
        assert!(fixed > 0);
        assert_eq!(AriaEnhancementPass::new("en").apply_fixes(&mut doc, &[]).unwrap(), 0);
    }

    #[test]
    fn test_contrast_stylesheet() {
        let mut overrides = BTreeMap::new();
        overrides.insert(".muted".to_string(), "color: #595959;".to_string());
        overrides.insert(".hint".to_string(), "color: #333333;".to_string());
        let pass = ContrastStylePass::new(overrides);

        let mut doc = Document::parse("<html><head><title>T</title></head><body></body></html>");
        assert_eq!(pass.apply_fixes(&mut doc, &[]).unwrap(), 3);
        assert_eq!(pass.apply_fixes(&mut doc, &[]).unwrap(), 0);

        let html = doc.to_html();
        assert_eq!(html.matches(CONTRAST_STYLE_ID).count(), 1);
        assert!(html.contains(".muted { color: #595959; }"));
        assert!(html.contains("</title><style id=\"a11y-contrast-enhancements\">"));
    }

    #[test]
    fn test_contrast_pass_creates_missing_head() {
        let mut doc = Document::parse("<html><body><p>x</p></body></html>");
        let head = doc.head().unwrap();
        doc.detach(head);
        assert!(doc.head().is_none());

        assert_eq!(ContrastStylePass::new(BTreeMap::new()).apply_fixes(&mut doc, &[]).unwrap(), 1);
        let head = doc.head().unwrap();
        assert_eq!(doc.parent(head), doc.html_element());
        assert!(doc.to_html().starts_with("<html><head><style"));
    }
}
