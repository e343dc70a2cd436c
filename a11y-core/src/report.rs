use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::A11yError;
use crate::types::{ComplianceLevel, RemediationResult, RuleDescriptor, Violation};

/// Violation counts for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub page_identifier: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub rules_evaluated: usize,
    pub total_violations: usize,
    pub auto_fixable_violations: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_rule: BTreeMap<String, usize>,
}

impl ComplianceReport {
    /// Levels come from `rules`; a violation whose rule is not listed is
    /// counted everywhere except `by_level`.
    pub fn build(page: Option<&str>, violations: &[Violation], rules: &[RuleDescriptor]) -> Self {
        let levels: HashMap<&str, ComplianceLevel> =
            rules.iter().map(|r| (r.id.as_str(), r.level)).collect();

        let mut by_level = BTreeMap::new();
        let mut by_severity = BTreeMap::new();
        let mut by_rule = BTreeMap::new();

        for violation in violations {
            if let Some(level) = levels.get(violation.rule_id()) {
                *by_level.entry(level.to_string()).or_insert(0) += 1;
            }
            *by_severity.entry(violation.severity().to_string()).or_insert(0) += 1;
            *by_rule.entry(violation.rule_id().to_string()).or_insert(0) += 1;
        }

        Self {
            page_identifier: page.map(str::to_string),
            generated_at: Utc::now(),
            rules_evaluated: rules.len(),
            total_violations: violations.len(),
            auto_fixable_violations: violations.iter().filter(|v| v.is_auto_fixable()).count(),
            by_level,
            by_severity,
            by_rule,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.total_violations == 0
    }

    pub fn to_json(&self) -> Result<String, A11yError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: String,
    pub violations: usize,
    pub fixes_applied: usize,
    pub modified: bool,
}

/// Totals across a batch of remediation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub generated_at: DateTime<Utc>,
    pub page_count: usize,
    pub total_violations: usize,
    pub total_fixes: usize,
    pub pages: Vec<PageSummary>,
    /// Pages whose result carries an error message
    pub failed_pages: Vec<String>,
}

impl SummaryReport {
    pub fn from_results(results: &[RemediationResult]) -> Self {
        let mut pages = Vec::with_capacity(results.len());
        let mut failed_pages = Vec::new();

        for (index, result) in results.iter().enumerate() {
            let page = result
                .page_identifier
                .clone()
                .unwrap_or_else(|| format!("page-{}", index + 1));
            if result.error_message.is_some() {
                failed_pages.push(page.clone());
            }
            pages.push(PageSummary {
                page,
                violations: result.violations.len(),
                fixes_applied: result.fixes_applied,
                modified: result.is_modified(),
            });
        }

        Self {
            generated_at: Utc::now(),
            page_count: results.len(),
            total_violations: pages.iter().map(|p| p.violations).sum(),
            total_fixes: pages.iter().map(|p| p.fixes_applied).sum(),
            pages,
            failed_pages,
        }
    }

    pub fn to_json(&self) -> Result<String, A11yError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
