// A11y Core Library
//
// WCAG 2.1 evaluation and remediation for HTML documents. Markup is parsed
// into an arena document, checked by an ordered set of rules, and fixed on a
// copy so the input is never changed.

pub mod types;
pub mod dom;
pub mod rules;
pub mod color;
pub mod style;
pub mod config;
pub mod error;
pub mod remediation;
pub mod processor;
pub mod report;

// Re-export main types and functions for easy use
pub use types::*;
pub use dom::{Document, Location, NodeId, Selector};
pub use rules::{Rule, RuleEngine};
pub use config::{ComplianceConfig, CustomRuleConfig, RemediationOptions};
pub use error::A11yError;
pub use remediation::RemediationEngine;
pub use processor::AccessibilityProcessor;
pub use report::{ComplianceReport, SummaryReport};
