use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dom::{Document, Location, NodeId};

// ===== COMPLIANCE LEVELS & SEVERITY =====

/// WCAG conformance level. A is always evaluated; AA and AAA are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplianceLevel {
    A,
    AA,
    AAA,
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceLevel::A => write!(f, "A"),
            ComplianceLevel::AA => write!(f, "AA"),
            ComplianceLevel::AAA => write!(f, "AAA"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        };
        write!(f, "{label}")
    }
}

// ===== RULE METADATA =====

/// Static description of a rule, as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub description: String,
    pub criterion: String,
    pub level: ComplianceLevel,
    pub auto_fixable: bool,
}

// ===== VIOLATIONS =====

/// One detected instance of a rule failure.
///
/// Built during evaluation and never modified afterwards; fields are read
/// through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    rule_id: String,
    check: String,
    message: String,
    element: String,
    location: Location,
    severity: Severity,
    auto_fixable: bool,
    remediation: String,
}

impl Violation {
    /// Start a violation against `node`. `check` is the stable key of the
    /// sub-check that fired (for example `missing-alt`).
    pub fn new(
        rule_id: &str,
        check: &str,
        document: &Document,
        node: NodeId,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            check: check.to_string(),
            message: message.into(),
            element: document.outer_html(node),
            location: document.location_of(node),
            severity,
            auto_fixable: false,
            remediation: String::new(),
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn check(&self) -> &str {
        &self.check
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Serialised markup of the offending element.
    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_auto_fixable(&self) -> bool {
        self.auto_fixable
    }

    pub fn remediation(&self) -> &str {
        &self.remediation
    }
}

// ===== REMEDIATION OUTPUT =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationResult {
    pub page_identifier: Option<String>,
    pub original_markup: String,
    pub remediated_markup: String,
    /// The violations that were handed to remediation, unchanged.
    pub violations: Vec<Violation>,
    pub fixes_applied: usize,
    pub change_log: Vec<String>,
    pub error_message: Option<String>,
}

impl RemediationResult {
    pub fn is_modified(&self) -> bool {
        self.original_markup != self.remediated_markup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_builder() {
        let doc = Document::parse("<img src='cat.png'>");
        let img = doc.first_element_by_tag("img").unwrap();
        let violation = Violation::new(
            "1.1.1-img-alt",
            "missing-alt",
            &doc,
            img,
            Severity::Critical,
            "Image missing alt attribute",
        )
        .with_remediation("Add an alt attribute")
        .fixable();

        assert_eq!(violation.rule_id(), "1.1.1-img-alt");
        assert_eq!(violation.element(), "<img src=\"cat.png\">");
        assert_eq!(violation.location().path(), "/html/body/img");
        assert_eq!(violation.location().node(), img);
        assert!(violation.is_auto_fixable());
    }

    #[test]
    fn test_severity_serialises_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        assert!(Severity::Critical < Severity::Minor);
        assert!(ComplianceLevel::A < ComplianceLevel::AAA);
    }
}
