//! WCAG 3.1.1 Language of Page (Level A)
//!
//! The root element must declare a valid language. Passages in another
//! language are spotted with a small phrase dictionary, not real language
//! detection.

use anyhow::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::{fix_targets, Rule};
use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, Severity, Violation};

static_selector!(
    TEXT_BLOCKS,
    "p, span, div, h1, h2, h3, h4, h5, h6, li, td, th, blockquote"
);

static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap());

/// (language, phrase) pairs matched as whole words, case-insensitively.
static FOREIGN_PHRASES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("fr", "bonjour"),
        ("fr", "au revoir"),
        ("fr", "merci beaucoup"),
        ("es", "hola"),
        ("es", "gracias"),
        ("es", "buenos días"),
        ("de", "guten tag"),
        ("de", "auf wiedersehen"),
        ("de", "danke schön"),
        ("it", "ciao"),
        ("it", "arrivederci"),
        ("it", "buongiorno"),
    ]
    .into_iter()
    .map(|(lang, phrase)| {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(phrase));
        (lang, Regex::new(&pattern).unwrap())
    })
    .collect()
});

const RULE_ID: &str = "3.1.1-language";

pub struct LanguageAttributeRule {
    default_language: String,
}

impl LanguageAttributeRule {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
        }
    }
}

impl Default for LanguageAttributeRule {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Rule for LanguageAttributeRule {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn description(&self) -> &str {
        "The page language must be declared"
    }

    fn criterion(&self) -> &str {
        "3.1.1 Language of Page"
    }

    fn level(&self) -> ComplianceLevel {
        ComplianceLevel::A
    }

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        let Some(root) = document.html_element() else {
            return Ok(violations);
        };

        let page_language = document.non_empty_attr(root, "lang");
        match page_language {
            None => violations.push(
                Violation::new(
                    RULE_ID,
                    "missing-lang",
                    document,
                    root,
                    Severity::Serious,
                    "Page does not declare its language",
                )
                .with_remediation(format!("Add lang=\"{}\" to the <html> element", self.default_language))
                .fixable(),
            ),
            Some(lang) if !is_valid_language_tag(lang) => violations.push(
                Violation::new(
                    RULE_ID,
                    "invalid-lang",
                    document,
                    root,
                    Severity::Serious,
                    format!("Page language \"{lang}\" is not a valid language tag"),
                )
                .with_remediation("Use a BCP 47 tag such as \"en\" or \"fr-CA\"")
                .fixable(),
            ),
            Some(_) => {}
        }

        let page_language = page_language.unwrap_or_default().to_ascii_lowercase();
        let with_text = document.elements_with_text();
        let blocks = document.select(&TEXT_BLOCKS);
        let detected: HashMap<NodeId, &'static str> = blocks
            .iter()
            .copied()
            .filter(|block| with_text.contains(block))
            .filter_map(|block| {
                foreign_language(&document.text(block), &page_language).map(|lang| (block, lang))
            })
            .collect();

        // Report the innermost block only: an ancestor block detected as the
        // same language is covered by its descendant.
        let mut covered = HashSet::new();
        for (&block, &lang) in &detected {
            for ancestor in document.ancestors(block) {
                if detected.get(&ancestor) == Some(&lang) && !covered.insert(ancestor) {
                    break;
                }
            }
        }

        for block in blocks {
            let Some(&lang) = detected.get(&block) else {
                continue;
            };
            if covered.contains(&block) || declares_language(document, block, root) {
                continue;
            }
            violations.push(
                Violation::new(
                    RULE_ID,
                    "foreign-passage",
                    document,
                    block,
                    Severity::Moderate,
                    format!("Content appears to be in another language ({lang}) without a lang attribute"),
                )
                .with_remediation(format!("Add lang=\"{lang}\" to the element containing the passage")),
            );
        }

        Ok(violations)
    }

    fn can_auto_fix(&self) -> bool {
        true
    }

    fn apply_fixes(&self, document: &mut Document, violations: &[Violation]) -> Result<usize> {
        let mut fixed = 0;
        let targets = fix_targets(document, violations, "missing-lang")
            .into_iter()
            .chain(fix_targets(document, violations, "invalid-lang"));
        for root in targets.collect::<Vec<_>>() {
            let valid = document
                .non_empty_attr(root, "lang")
                .is_some_and(is_valid_language_tag);
            if !valid {
                document.set_attr(root, "lang", &self.default_language);
                fixed += 1;
            }
        }
        Ok(fixed)
    }
}

pub fn is_valid_language_tag(tag: &str) -> bool {
    LANGUAGE_TAG.is_match(tag.trim())
}

/// The element or an ancestor below the root carries its own `lang`.
fn declares_language(document: &Document, element: NodeId, root: NodeId) -> bool {
    std::iter::once(element)
        .chain(document.ancestors(element))
        .take_while(|node| *node != root)
        .any(|node| document.non_empty_attr(node, "lang").is_some())
}

fn foreign_language(text: &str, page_language: &str) -> Option<&'static str> {
    FOREIGN_PHRASES
        .iter()
        .filter(|(lang, _)| !page_language.starts_with(lang))
        .find(|(_, phrase)| phrase.is_match(text))
        .map(|(lang, _)| *lang)
}
