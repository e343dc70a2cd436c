use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

use crate::types::{ComplianceLevel, Severity};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_level() -> ComplianceLevel {
    ComplianceLevel::A
}

fn default_severity() -> Severity {
    Severity::Moderate
}

/// Which rules the engine activates and what extra data remediation uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Evaluate Level AA rules
    #[serde(default = "default_true")]
    pub include_level_aa: bool,
    /// Evaluate Level AAA rules
    #[serde(default)]
    pub include_level_aaa: bool,
    /// Language written to a document root that lacks a valid `lang`
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Declarative rules appended after the built-in ones
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
    /// Selector to declaration block, injected by the contrast pass
    #[serde(default)]
    pub css_overrides: BTreeMap<String, String>,
    /// Page patterns the caller should skip. Not interpreted by the core.
    #[serde(default)]
    pub excluded_pages: Vec<String>,
}

/// A rule that requires an attribute on every element matching a selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub criterion: String,
    #[serde(default = "default_level")]
    pub level: ComplianceLevel,
    pub selector: String,
    pub required_attribute: String,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub remediation: String,
    /// Value written when fixing; the rule is not auto-fixable without it
    #[serde(default)]
    pub fix_value: Option<String>,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            include_level_aa: true,
            include_level_aaa: false,
            default_language: default_language(),
            custom_rules: Vec::new(),
            css_overrides: BTreeMap::new(),
            excluded_pages: Vec::new(),
        }
    }
}

impl ComplianceConfig {
    pub fn includes(&self, level: ComplianceLevel) -> bool {
        match level {
            ComplianceLevel::A => true,
            ComplianceLevel::AA => self.include_level_aa,
            ComplianceLevel::AAA => self.include_level_aaa,
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load config from file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

/// Switches for a single remediation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationOptions {
    #[serde(default = "default_true")]
    pub auto_fix: bool,
    #[serde(default = "default_true")]
    pub apply_aria_enhancements: bool,
    #[serde(default = "default_true")]
    pub fix_contrast_issues: bool,
    /// Keep markup comments in the remediated output
    #[serde(default = "default_true")]
    pub preserve_comments: bool,
    /// Where the processor writes the remediated markup, if anywhere
    #[serde(default)]
    pub save_to_path: Option<PathBuf>,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self {
            auto_fix: true,
            apply_aria_enhancements: true,
            fix_contrast_issues: true,
            preserve_comments: true,
            save_to_path: None,
        }
    }
}

impl RemediationOptions {
    /// Options that report violations without touching the document.
    pub fn report_only() -> Self {
        Self {
            auto_fix: false,
            ..Self::default()
        }
    }
}
