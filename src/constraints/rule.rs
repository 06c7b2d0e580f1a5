//! Constraint rule definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue grade of a rule
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; does not affect validity
    #[serde(alias = "information")]
    Warning,
    /// The rule evaluated to false
    Error,
    /// The rule could not be evaluated
    Fatal,
}

impl Severity {
    /// Lower-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Packaged with the engine
    Base,
    /// Merged from a profile differential
    Profile,
}

/// One invariant attached to a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintRule {
    /// Rule key, unique within one type (`pat-1`)
    pub key: String,
    /// Expression evaluated on every node of the type
    pub expression: String,
    /// Grade of the issue raised when the expression is false
    pub severity: Severity,
    /// Human-readable description
    pub description: String,
    /// Source of the rule
    pub origin: RuleOrigin,
    /// Relative element path the expression was scoped to (`contact`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ConstraintRule {
    /// Create a base rule applying to the type root
    pub fn new(
        key: impl Into<String>,
        severity: Severity,
        expression: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            expression: expression.into(),
            severity,
            description: description.into(),
            origin: RuleOrigin::Base,
            scope: None,
        }
    }

    /// Set the origin
    pub fn with_origin(mut self, origin: RuleOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Scope the expression to a relative path: `path.all(expression)`
    pub fn scoped_to(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.expression = format!("{path}.all({})", self.expression);
        self.scope = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scoping_wraps_the_expression() {
        let rule = ConstraintRule::new("pat-1", Severity::Error, "name.exists()", "")
            .with_origin(RuleOrigin::Profile)
            .scoped_to("contact");
        assert_eq!(rule.expression, "contact.all(name.exists())");
        assert_eq!(rule.scope.as_deref(), Some("contact"));
    }

    #[test]
    fn severities_order_by_gravity() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert_eq!(
            serde_json::to_string(&Severity::Fatal).unwrap(),
            "\"fatal\""
        );
    }
}
