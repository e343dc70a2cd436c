use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ComplianceConfig, RemediationOptions};
use crate::dom::Document;
use crate::error::A11yError;
use crate::remediation::RemediationEngine;
use crate::report::ComplianceReport;
use crate::rules::{Rule, RuleEngine};
use crate::types::{RemediationResult, RuleDescriptor, Violation};

/// Evaluate-then-remediate entry point for one configuration.
pub struct AccessibilityProcessor {
    config: ComplianceConfig,
    rule_engine: Arc<RuleEngine>,
    remediation: RemediationEngine,
}

impl AccessibilityProcessor {
    pub fn new(config: ComplianceConfig) -> Result<Self, A11yError> {
        Self::with_custom_rules(config, Vec::new())
    }

    /// Create a processor with additional programmatic rules
    pub fn with_custom_rules(
        config: ComplianceConfig,
        rules: Vec<Box<dyn Rule>>,
    ) -> Result<Self, A11yError> {
        let rule_engine = Arc::new(RuleEngine::with_custom_rules(&config, rules)?);
        let remediation = RemediationEngine::new(Arc::clone(&rule_engine), &config);
        Ok(Self {
            config,
            rule_engine,
            remediation,
        })
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    pub fn rule_engine(&self) -> Arc<RuleEngine> {
        Arc::clone(&self.rule_engine)
    }

    pub fn evaluate(&self, document: &Document) -> Vec<Violation> {
        self.rule_engine.evaluate(document)
    }

    /// Evaluate, fix, and write the result to `save_to_path` when set. A
    /// failed write is reported in `error_message`.
    pub fn remediate(&self, document: &Document, options: &RemediationOptions) -> RemediationResult {
        let violations = self.evaluate(document);
        let mut result = self.remediation.apply_fixes(document, &violations, options);

        if let Some(path) = &options.save_to_path {
            match save_markup(path, &result.remediated_markup) {
                Ok(()) => info!("Saved remediated markup to {}", path.display()),
                Err(e) => {
                    warn!("Failed to save remediated markup to {}: {}", path.display(), e);
                    result.error_message = Some(e.to_string());
                }
            }
        }

        result
    }

    pub fn active_rules(&self) -> Vec<RuleDescriptor> {
        self.rule_engine.active_rules()
    }

    pub fn report(&self, document: &Document) -> ComplianceReport {
        let violations = self.evaluate(document);
        ComplianceReport::build(document.page_id(), &violations, &self.active_rules())
    }
}

fn save_markup(path: &Path, markup: &str) -> Result<(), A11yError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, markup)?;
    Ok(())
}
