use thiserror::Error;

/// Errors raised by the accessibility core.
///
/// Only configuration problems escape to callers at construction time. Rule
/// failures during evaluation or fixing are recovered by the engines and are
/// represented here so they render consistently in logs and change logs.
#[derive(Error, Debug)]
pub enum A11yError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Rule {rule_id} failed during evaluation: {reason}")]
    RuleEvaluation { rule_id: String, reason: String },

    #[error("Error fixing {rule_id}: {reason}")]
    RuleFix { rule_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
