//! Aggregation of many validation outcomes
//!
//! Harnesses that validate a corpus of instances fold every outcome into a
//! [`BatchReport`] and print its summary. All bookkeeping lives in the report, so
//! two batches never see each other's state.

use super::outcome::{Issue, Outcome};
use crate::compiler::{CompiledExpression, TypeSpecifier};
use crate::constraints::{CompiledRepository, Severity};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Diagnostics known to fail for environmental reasons
///
/// An entry matches an issue whose diagnostics equal it, or whose expression part
/// equals it. The expression part is whatever follows the issue's own `path: `
/// prefix, so compile failures (`failed to compile: ...`) only match in full.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedDiagnostics {
    entries: Vec<String>,
}

impl ExpectedDiagnostics {
    /// Create an allowlist
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an issue is expected
    pub fn covers(&self, issue: &Issue) -> bool {
        let expression = issue
            .diagnostics
            .strip_prefix(issue.path.as_str())
            .and_then(|rest| rest.strip_prefix(": "));
        self.entries.iter().any(|entry| {
            *entry == issue.diagnostics || expression.is_some_and(|expression| expression == entry.as_str())
        })
    }

    /// Whether the allowlist is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Batch settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Diagnostics that do not make an instance invalid
    #[serde(default)]
    pub expected_diagnostics: ExpectedDiagnostics,
}

/// Something worth a second look in a rule's compiled expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFinding {
    /// Type the rule is registered for
    pub type_name: String,
    /// Rule key
    pub key: String,
    /// What was found
    pub finding: String,
    /// Expression text
    pub expression: String,
}

/// Running totals over many validated instances
#[derive(Debug, Default)]
pub struct BatchReport {
    config: BatchConfig,
    instances: usize,
    invalid: Vec<String>,
    failed_codes: IndexMap<String, usize>,
    checked_keys: FxHashSet<String>,
    findings: Vec<RuleFinding>,
}

impl BatchReport {
    /// Create an empty report
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Fold the outcome of one instance into the report
    ///
    /// The instance counts as invalid when an Error or Fatal issue remains after
    /// the expected diagnostics are removed. Codes of those issues are tallied.
    pub fn record(&mut self, name: &str, outcome: &Outcome) {
        self.instances += 1;

        let relevant: Vec<&Issue> = outcome
            .issues()
            .iter()
            .filter(|issue| !self.config.expected_diagnostics.covers(issue))
            .filter(|issue| issue.severity != Severity::Warning)
            .collect();
        if relevant.is_empty() {
            return;
        }

        log::debug!("validating {name} failed:");
        for issue in &relevant {
            log::debug!("\t{issue}");
            *self.failed_codes.entry(issue.code.clone()).or_insert(0) += 1;
        }
        self.invalid.push(name.to_string());
    }

    /// Inspect the rules of a repository, each key at most once per report
    ///
    /// Returns the findings for keys not seen before.
    pub fn audit_rules(&mut self, repository: &CompiledRepository) -> Vec<RuleFinding> {
        let mut found = Vec::new();
        for (type_name, rule) in repository.rules() {
            if !self.checked_keys.insert(rule.rule.key.clone()) {
                continue;
            }
            let Ok(compiled) = &rule.compiled else {
                continue;
            };
            for finding in inspect(compiled) {
                let finding = RuleFinding {
                    type_name: type_name.to_string(),
                    key: rule.rule.key.clone(),
                    finding,
                    expression: rule.rule.expression.clone(),
                };
                log::debug!(
                    "expression {} {}: '{}'",
                    finding.key,
                    finding.finding,
                    finding.expression
                );
                found.push(finding);
            }
        }
        self.findings.extend(found.iter().cloned());
        found
    }

    /// Number of recorded instances
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// Names of the invalid instances, in recording order
    pub fn invalid(&self) -> &[String] {
        &self.invalid
    }

    /// Occurrences of each failing rule code, in first-seen order
    pub fn failed_codes(&self) -> &IndexMap<String, usize> {
        &self.failed_codes
    }

    /// Every finding of [`Self::audit_rules`] so far
    pub fn findings(&self) -> &[RuleFinding] {
        &self.findings
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Validation failed in {} of {} examples",
            self.invalid.len(),
            self.instances
        );
        if !self.failed_codes.is_empty() {
            let codes: Vec<String> = self
                .failed_codes
                .iter()
                .map(|(code, count)| format!("{code} ({count})"))
                .collect();
            let _ = write!(summary, "\nIssues with Invariant: {}", codes.join(", "));
        }
        summary
    }
}

/// Constructs that tend to behave differently across engines
fn inspect(compiled: &CompiledExpression) -> Vec<String> {
    let mut findings = Vec::new();
    if compiled.has_choice_marker() {
        findings.push("navigates a choice marker ([x])".to_string());
    }
    if compiled.references_parent() {
        findings.push("refers to the parent element".to_string());
    }
    for target in compiled.type_tests() {
        if let TypeSpecifier::System(kind) = target {
            findings.push(format!("tests for primitive kind {kind}"));
        }
    }
    findings
}
