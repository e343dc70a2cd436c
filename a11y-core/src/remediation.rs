use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ComplianceConfig, RemediationOptions};
use crate::dom::{Document, SerializeOptions};
use crate::error::A11yError;
use crate::rules::engine::panic_message;
use crate::rules::enhancements::{AriaEnhancementPass, ContrastStylePass};
use crate::rules::{Rule, RuleEngine};
use crate::types::{RemediationResult, Violation};

/// Applies rule fixers and enhancement passes to a copy of a document.
///
/// The input document is never modified. Each fixer runs against a
/// checkpoint of the working copy; if it fails, the copy is restored and the
/// failure is recorded in the change log.
pub struct RemediationEngine {
    rule_engine: Arc<RuleEngine>,
    aria_pass: AriaEnhancementPass,
    contrast_pass: ContrastStylePass,
}

impl RemediationEngine {
    pub fn new(rule_engine: Arc<RuleEngine>, config: &ComplianceConfig) -> Self {
        Self {
            rule_engine,
            aria_pass: AriaEnhancementPass::new(&config.default_language),
            contrast_pass: ContrastStylePass::new(config.css_overrides.clone()),
        }
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.rule_engine
    }

    pub fn apply_fixes(
        &self,
        document: &Document,
        violations: &[Violation],
        options: &RemediationOptions,
    ) -> RemediationResult {
        let original_markup = document.to_html();
        let mut result = RemediationResult {
            page_identifier: document.page_id().map(str::to_string),
            remediated_markup: original_markup.clone(),
            original_markup,
            violations: violations.to_vec(),
            fixes_applied: 0,
            change_log: Vec::new(),
            error_message: None,
        };

        if !options.auto_fix {
            debug!("Auto-fix disabled; returning document unchanged");
            return result;
        }

        let mut working = document.clone();

        for rule in self.rule_engine.rules() {
            if !rule.can_auto_fix() {
                continue;
            }
            let own: Vec<Violation> = violations
                .iter()
                .filter(|v| v.rule_id() == rule.id())
                .cloned()
                .collect();
            if own.is_empty() {
                continue;
            }
            result.fixes_applied += run_fixer(rule.as_ref(), &mut working, &own, &mut result.change_log);
        }

        if options.apply_aria_enhancements {
            result.fixes_applied += run_fixer(&self.aria_pass, &mut working, &[], &mut result.change_log);
        }
        if options.fix_contrast_issues {
            result.fixes_applied += run_fixer(&self.contrast_pass, &mut working, &[], &mut result.change_log);
        }

        result.remediated_markup = working.to_html_with(&SerializeOptions {
            include_comments: options.preserve_comments,
        });

        info!(
            "Remediation applied {} fix(es) for {} violation(s){}",
            result.fixes_applied,
            violations.len(),
            result
                .page_identifier
                .as_deref()
                .map(|page| format!(" on {page}"))
                .unwrap_or_default()
        );

        result
    }
}

/// Run one fixer against a checkpoint of `working`. Returns the number of
/// fixes kept.
fn run_fixer(
    rule: &dyn Rule,
    working: &mut Document,
    violations: &[Violation],
    change_log: &mut Vec<String>,
) -> usize {
    let checkpoint = working.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| rule.apply_fixes(working, violations)))
        .unwrap_or_else(|panic| Err(anyhow::anyhow!(panic_message(panic.as_ref()))));

    match outcome {
        Ok(0) => 0,
        Ok(count) => {
            change_log.push(format!(
                "{}: applied {} fix(es) ({})",
                rule.id(),
                count,
                rule.description()
            ));
            count
        }
        Err(e) => {
            *working = checkpoint;
            let error = A11yError::RuleFix {
                rule_id: rule.id().to_string(),
                reason: e.to_string(),
            };
            warn!("{error}");
            change_log.push(error.to_string());
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComplianceLevel, Severity};

    /// Marks every paragraph, then fails.
    struct HalfwayRule;

    impl Rule for HalfwayRule {
        fn id(&self) -> &str {
            "test-halfway"
        }
        fn description(&self) -> &str {
            "Fails after mutating"
        }
        fn criterion(&self) -> &str {
            ""
        }
        fn level(&self) -> ComplianceLevel {
            ComplianceLevel::A
        }
        fn evaluate(&self, document: &Document) -> anyhow::Result<Vec<Violation>> {
            Ok(document
                .elements_by_tag("p")
                .into_iter()
                .map(|p| Violation::new("test-halfway", "marker", document, p, Severity::Minor, "p").fixable())
                .collect())
        }
        fn can_auto_fix(&self) -> bool {
            true
        }
        fn apply_fixes(&self, document: &mut Document, _violations: &[Violation]) -> anyhow::Result<usize> {
            for p in document.elements_by_tag("p") {
                document.set_attr(p, "data-touched", "yes");
            }
            anyhow::bail!("gave up")
        }
    }

    /// Retitles the document, then panics.
    struct PanickingRule;

    impl Rule for PanickingRule {
        fn id(&self) -> &str {
            "test-panicking"
        }
        fn description(&self) -> &str {
            "Panics after mutating"
        }
        fn criterion(&self) -> &str {
            ""
        }
        fn level(&self) -> ComplianceLevel {
            ComplianceLevel::A
        }
        fn evaluate(&self, document: &Document) -> anyhow::Result<Vec<Violation>> {
            let html = document.html_element().into_iter();
            Ok(html
                .map(|node| Violation::new("test-panicking", "marker", document, node, Severity::Minor, "html").fixable())
                .collect())
        }
        fn can_auto_fix(&self) -> bool {
            true
        }
        fn apply_fixes(&self, document: &mut Document, _violations: &[Violation]) -> anyhow::Result<usize> {
            if let Some(html) = document.html_element() {
                document.set_attr(html, "data-half-done", "yes");
                let body = document.body().unwrap_or(html);
                let marker = document.create_element("div", &[("id", "half-done")]);
                document.append_child(body, marker);
            }
            panic!("fixer state corrupted");
        }
    }

    fn engine(extra: Vec<Box<dyn Rule>>) -> RemediationEngine {
        let config = ComplianceConfig::default();
        let rules = Arc::new(RuleEngine::with_custom_rules(&config, extra).unwrap());
        RemediationEngine::new(rules, &config)
    }

    fn fixes_only() -> RemediationOptions {
        RemediationOptions {
            apply_aria_enhancements: false,
            fix_contrast_issues: false,
            ..RemediationOptions::default()
        }
    }

    #[test]
    fn test_report_only_is_identity() {
        let remediation = engine(Vec::new());
        let doc = Document::parse(r#"<html><body><img src="cat.png"></body></html>"#);
        let violations = remediation.rule_engine().evaluate(&doc);
        let result = remediation.apply_fixes(&doc, &violations, &RemediationOptions::report_only());

        assert_eq!(result.original_markup, result.remediated_markup);
        assert_eq!(result.fixes_applied, 0);
        assert!(result.change_log.is_empty());
        assert_eq!(result.violations, violations);
    }

    #[test]
    fn test_fixes_and_change_log() {
        let remediation = engine(Vec::new());
        let doc = Document::parse(r#"<html lang="en"><body><h1>T</h1><img src="/img/red-car.jpg"></body></html>"#);
        let violations = remediation.rule_engine().evaluate(&doc);
        let result = remediation.apply_fixes(&doc, &violations, &fixes_only());

        assert_eq!(result.fixes_applied, 1);
        assert_eq!(
            result.change_log,
            vec!["1.1.1-img-alt: applied 1 fix(es) (Images must have meaningful alternative text)".to_string()]
        );
        assert!(result.remediated_markup.contains(r#"alt="Red car""#));
        // Input untouched.
        assert_eq!(doc.to_html(), result.original_markup);
    }

    #[test]
    fn test_failed_fixer_is_rolled_back() {
        let remediation = engine(vec![Box::new(HalfwayRule)]);
        let doc = Document::parse(r#"<html lang="en"><body><h1>T</h1><p>Text</p><img src="dog.png"></body></html>"#);
        let violations = remediation.rule_engine().evaluate(&doc);
        let result = remediation.apply_fixes(&doc, &violations, &fixes_only());

        assert!(!result.remediated_markup.contains("data-touched"));
        assert!(result.remediated_markup.contains(r#"alt="Dog""#));
        assert!(result
            .change_log
            .contains(&"Error fixing test-halfway: gave up".to_string()));
        assert_eq!(result.fixes_applied, 1);
    }

    #[test]
    fn test_panicking_fixer_is_rolled_back() {
        let remediation = engine(vec![Box::new(PanickingRule)]);
        let doc = Document::parse(r#"<html lang="en"><body><h1>T</h1><img src="dog.png"></body></html>"#);
        let violations = remediation.rule_engine().evaluate(&doc);
        let result = remediation.apply_fixes(&doc, &violations, &fixes_only());

        assert!(!result.remediated_markup.contains("half-done"));
        assert!(result.remediated_markup.contains(r#"alt="Dog""#));
        assert!(result
            .change_log
            .contains(&"Error fixing test-panicking: panicked: fixer state corrupted".to_string()));
        assert_eq!(result.fixes_applied, 1);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_enhancement_passes_count_toward_fixes() {
        let remediation = engine(Vec::new());
        let doc = Document::parse("<html lang=\"en\"><head></head><body><h1>T</h1><nav>Menu</nav></body></html>");
        let result = remediation.apply_fixes(&doc, &[], &RemediationOptions::default());

        // navigation landmark plus the baseline stylesheet
        assert_eq!(result.fixes_applied, 2);
        assert!(result.remediated_markup.contains(r#"<nav role="navigation">"#));
        assert!(result.remediated_markup.contains("a11y-contrast-enhancements"));
    }

    #[test]
    fn test_comments_stripped_on_request() {
        let remediation = engine(Vec::new());
        let doc = Document::parse("<html lang=\"en\"><body><!-- note --><h1>T</h1></body></html>");
        let options = RemediationOptions {
            preserve_comments: false,
            ..fixes_only()
        };
        let result = remediation.apply_fixes(&doc, &[], &options);
        assert!(result.original_markup.contains("<!-- note -->"));
        assert!(!result.remediated_markup.contains("note"));
    }
}
