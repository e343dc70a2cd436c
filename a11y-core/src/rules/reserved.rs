//! Level AAA criteria that are registered so they show up in rule listings
//! and reports, but have no automated check yet.

use anyhow::Result;

use super::Rule;
use crate::dom::Document;
use crate::types::{ComplianceLevel, Violation};

macro_rules! reserved_rule {
    ($name:ident, $id:expr, $criterion:expr, $description:expr) => {
        pub struct $name;

        impl Rule for $name {
            fn id(&self) -> &str {
                $id
            }

            fn description(&self) -> &str {
                $description
            }

            fn criterion(&self) -> &str {
                $criterion
            }

            fn level(&self) -> ComplianceLevel {
                ComplianceLevel::AAA
            }

            fn evaluate(&self, _document: &Document) -> Result<Vec<Violation>> {
                Ok(Vec::new())
            }
        }
    };
}

reserved_rule!(
    SignLanguageRule,
    "1.2.6-sign-language",
    "1.2.6 Sign Language (Prerecorded)",
    "Prerecorded audio content should have sign language interpretation"
);

reserved_rule!(
    ReadingLevelRule,
    "3.1.5-reading-level",
    "3.1.5 Reading Level",
    "Text beyond lower secondary reading level should have a simpler version"
);

reserved_rule!(
    PronunciationRule,
    "3.1.6-pronunciation",
    "3.1.6 Pronunciation",
    "Ambiguous pronunciation should be clarified"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_rules_never_report() {
        let doc = Document::parse("<video src='talk.mp4'></video><p>Row the bow.</p>");
        let rules: [&dyn Rule; 3] = [&SignLanguageRule, &ReadingLevelRule, &PronunciationRule];
        for rule in rules {
            assert_eq!(rule.level(), ComplianceLevel::AAA);
            assert!(!rule.can_auto_fix());
            assert!(rule.evaluate(&doc).unwrap().is_empty());
        }
    }
}
