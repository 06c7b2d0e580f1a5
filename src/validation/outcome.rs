//! Issues and outcomes of a validation run

use crate::constraints::Severity;
use serde::Serialize;
use std::fmt;

/// One finding of a validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Grade
    pub severity: Severity,
    /// Rule key (`pat-1`)
    pub code: String,
    /// Diagnostic text
    pub diagnostics: String,
    /// Path of the node the rule was evaluated on
    pub path: String,
    /// Human-readable description of the rule
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.severity, self.diagnostics)
    }
}

/// Ordered issues of a run
///
/// Counts are derived from the issue list on demand, so they always agree with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    issues: Vec<Issue>,
}

impl Outcome {
    /// Create an empty outcome
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Append the issues of another outcome, keeping their order
    pub fn merge(&mut self, other: Outcome) {
        self.issues.extend(other.issues);
    }

    /// Issues in emission order
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }

    /// Number of Error issues
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of Fatal issues
    pub fn fatals(&self) -> usize {
        self.count(Severity::Fatal)
    }

    /// Number of Warning issues
    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Valid iff there are no errors and no fatals
    pub fn is_valid(&self) -> bool {
        self.errors() + self.fatals() == 0
    }

    /// Whether no issue was raised at all
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl IntoIterator for Outcome {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}
