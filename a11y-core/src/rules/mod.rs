// Rules module - the rule contract plus one file per criterion
// - engine.rs: RuleEngine, builds the active rule list and evaluates it
// - image_alt.rs, form_label.rs, heading_structure.rs, table_headers.rs,
//   link_purpose.rs: Level A structure and naming checks
// - color_contrast.rs: Level AA contrast
// - keyboard_access.rs, focus_order.rs, language.rs, error_identification.rs
// - reserved.rs: AAA criteria that are registered but not yet evaluated
// - custom.rs: rules declared in ComplianceConfig
// - enhancements.rs: rule-shaped remediation passes (ARIA, contrast styles)

/// Compile a selector known at build time.
macro_rules! static_selector {
    ($name:ident, $source:expr) => {
        static $name: std::sync::LazyLock<crate::dom::Selector> = std::sync::LazyLock::new(|| {
            crate::dom::Selector::parse($source).expect("valid selector")
        });
    };
}

pub mod color_contrast;
pub mod custom;
pub mod engine;
pub mod enhancements;
pub mod error_identification;
pub mod focus_order;
pub mod form_label;
pub mod heading_structure;
pub mod image_alt;
pub mod keyboard_access;
pub mod language;
pub mod link_purpose;
pub mod reserved;
pub mod table_headers;

pub use engine::RuleEngine;

use anyhow::Result;
use std::collections::BTreeSet;

use crate::dom::{Document, NodeId};
use crate::types::{ComplianceLevel, RuleDescriptor, Violation};

/// Detector and optional fixer for one success criterion.
///
/// `evaluate` must not mutate anything. `apply_fixes` receives only this
/// rule's violations and re-checks each condition before changing the
/// document, so running it twice changes nothing the second time.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Success criterion reference, e.g. "1.1.1 Non-text Content".
    fn criterion(&self) -> &str;

    fn level(&self) -> ComplianceLevel;

    fn evaluate(&self, document: &Document) -> Result<Vec<Violation>>;

    fn can_auto_fix(&self) -> bool {
        false
    }

    /// Returns the number of changes made.
    fn apply_fixes(&self, _document: &mut Document, _violations: &[Violation]) -> Result<usize> {
        Ok(0)
    }

    fn descriptor(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id().to_string(),
            description: self.description().to_string(),
            criterion: self.criterion().to_string(),
            level: self.level(),
            auto_fixable: self.can_auto_fix(),
        }
    }
}

/// Nodes of the auto-fixable violations with the given check, resolved in
/// `document`, deduplicated, in violation order.
pub(crate) fn fix_targets(document: &Document, violations: &[Violation], check: &str) -> Vec<NodeId> {
    let mut seen = BTreeSet::new();
    violations
        .iter()
        .filter(|v| v.is_auto_fixable() && v.check() == check)
        .filter_map(|v| document.locate(v.location()))
        .filter(|node| seen.insert(*node))
        .collect()
}
