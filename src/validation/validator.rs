//! Depth-first invariant validation of an instance tree

use super::outcome::{Issue, Outcome};
use crate::constraints::{CompiledRepository, CompiledRule, Severity};
use crate::evaluator::{EvaluationContext, evaluate_boolean};
use crate::model::ResourceNode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Issue code used when a run stops on its time budget
pub const DEADLINE_CODE: &str = "validation-deadline";

/// Validator settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Wall-clock budget for one run, checked between top-level subtrees
    #[serde(default)]
    pub time_budget: Option<Duration>,
}

impl ValidatorConfig {
    /// Set the time budget
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

/// Evaluates every applicable rule on every node of a tree
///
/// Holds no state between runs; one validator can check any number of trees,
/// from any number of threads.
#[derive(Debug, Clone)]
pub struct InvariantValidator<'r> {
    repository: &'r CompiledRepository,
    config: ValidatorConfig,
}

impl<'r> InvariantValidator<'r> {
    /// Create a validator over a frozen repository
    pub fn new(repository: &'r CompiledRepository, config: ValidatorConfig) -> Self {
        Self { repository, config }
    }

    /// Validate a tree
    ///
    /// Nodes are visited in pre-order with children in document order, so the
    /// issue order is reproducible. Rule failures of any kind become issues.
    pub fn validate(&self, root: &ResourceNode) -> Outcome {
        let started = Instant::now();
        let mut outcome = Outcome::new();
        self.check_node(root, &[], &mut outcome);

        let mut ancestors = vec![root];
        for child in root.children() {
            if let Some(budget) = self.config.time_budget {
                if started.elapsed() >= budget {
                    log::debug!("{}: time budget of {budget:?} exceeded", root.path());
                    outcome.push(Issue {
                        severity: Severity::Fatal,
                        code: DEADLINE_CODE.to_string(),
                        diagnostics: format!(
                            "validation stopped before {}: time budget of {budget:?} exceeded",
                            child.path()
                        ),
                        path: root.path().to_string(),
                        description: String::new(),
                    });
                    break;
                }
            }
            self.walk(child, &mut ancestors, &mut outcome);
        }
        outcome
    }

    fn walk<'a>(
        &self,
        node: &'a ResourceNode,
        ancestors: &mut Vec<&'a ResourceNode>,
        outcome: &mut Outcome,
    ) {
        self.check_node(node, ancestors, outcome);
        ancestors.push(node);
        for child in node.children() {
            self.walk(child, ancestors, outcome);
        }
        ancestors.pop();
    }

    fn check_node(&self, node: &ResourceNode, ancestors: &[&ResourceNode], outcome: &mut Outcome) {
        let rules = self.repository.rules_for(node.type_name());
        if rules.is_empty() {
            return;
        }
        log::trace!("{}: checking {} rule(s)", node.path(), rules.len());

        let context = EvaluationContext::with_ancestors(node, ancestors);
        for rule in rules {
            if let Some(issue) = check_rule(rule, node, &context) {
                outcome.push(issue);
            }
        }
    }
}

fn check_rule(compiled: &CompiledRule, node: &ResourceNode, context: &EvaluationContext<'_>) -> Option<Issue> {
    let rule = &compiled.rule;
    let issue = |severity: Severity, diagnostics: String| Issue {
        severity,
        code: rule.key.clone(),
        diagnostics,
        path: node.path().to_string(),
        description: rule.description.clone(),
    };

    let expression = match &compiled.compiled {
        Ok(expression) => expression,
        Err(error) => {
            log::debug!("{}: {} not checked: {error}", node.path(), rule.key);
            return Some(issue(
                Severity::Fatal,
                format!("failed to compile: {}", rule.expression),
            ));
        }
    };

    match evaluate_boolean(expression, context) {
        Ok(Some(false)) => Some(issue(
            rule.severity,
            format!("{}: {}", node.path(), rule.expression),
        )),
        Ok(_) => None,
        Err(fault) => {
            log::debug!("{}: {} could not be evaluated: {fault}", node.path(), rule.key);
            Some(issue(
                Severity::Fatal,
                format!("{}: evaluating '{}' failed: {fault}", node.path(), rule.expression),
            ))
        }
    }
}

/// Validate a tree with the default configuration
pub fn validate(repository: &CompiledRepository, root: &ResourceNode) -> Outcome {
    InvariantValidator::new(repository, ValidatorConfig::default()).validate(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintRepository;
    use pretty_assertions::assert_eq;

    fn repository(definitions: &[(&str, &str, Severity, &str)]) -> CompiledRepository {
        ConstraintRepository::from_definitions(
            definitions
                .iter()
                .map(|(path, key, severity, expression)| (*path, *key, *severity, *expression, "")),
        )
        .unwrap()
        .freeze()
    }

    #[test]
    fn issues_follow_pre_order() {
        let repository = repository(&[
            ("Patient", "p-1", Severity::Error, "false"),
            ("HumanName", "n-1", Severity::Warning, "false"),
            ("ContactPoint", "c-1", Severity::Error, "false"),
        ]);
        let patient = ResourceNode::new("Patient")
            .with_children("name", vec![ResourceNode::new("HumanName"), ResourceNode::new("HumanName")])
            .with_child("telecom", ResourceNode::new("ContactPoint"));

        let outcome = validate(&repository, &patient);
        let order: Vec<_> = outcome
            .issues()
            .iter()
            .map(|issue| format!("{} {}", issue.code, issue.path))
            .collect();
        assert_eq!(
            order,
            vec![
                "p-1 Patient",
                "n-1 Patient.name[0]",
                "n-1 Patient.name[1]",
                "c-1 Patient.telecom"
            ]
        );
        assert_eq!(outcome.issues()[0].diagnostics, "Patient: false");
    }

    #[test]
    fn faults_become_fatal_issues() {
        let repository = repository(&[
            ("Patient", "p-1", Severity::Error, "name.family"),
            ("Patient", "p-2", Severity::Error, "name.exists()"),
        ]);
        let patient = ResourceNode::new("Patient").with_children(
            "name",
            vec![
                ResourceNode::new("HumanName").with_child("family", ResourceNode::primitive("string", "a")),
                ResourceNode::new("HumanName").with_child("family", ResourceNode::primitive("string", "b")),
            ],
        );

        let outcome = validate(&repository, &patient);
        assert_eq!(outcome.issues().len(), 1);
        assert_eq!(outcome.fatals(), 1);
        assert!(outcome.issues()[0].diagnostics.contains("name.family"));
    }

    #[test]
    fn parent_and_root_are_visible_from_nested_nodes() {
        let repository = repository(&[(
            "HumanName",
            "n-1",
            Severity::Error,
            "%resource.active and $parent.active",
        )]);
        let patient = ResourceNode::new("Patient")
            .with_child("active", ResourceNode::primitive("boolean", false))
            .with_child("name", ResourceNode::new("HumanName"));

        let outcome = validate(&repository, &patient);
        assert_eq!(outcome.errors(), 1);
        assert_eq!(outcome.issues()[0].path, "Patient.name");
    }

    #[test]
    fn exhausted_budget_stops_between_subtrees() {
        let repository = repository(&[("HumanName", "n-1", Severity::Error, "false")]);
        let patient = ResourceNode::new("Patient")
            .with_children("name", vec![ResourceNode::new("HumanName"), ResourceNode::new("HumanName")]);

        let validator = InvariantValidator::new(
            &repository,
            ValidatorConfig::default().with_time_budget(Duration::ZERO),
        );
        let outcome = validator.validate(&patient);

        let codes: Vec<_> = outcome.issues().iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(codes, vec![DEADLINE_CODE]);
        assert_eq!(outcome.issues()[0].severity, Severity::Fatal);
        assert_eq!(outcome.issues()[0].path, "Patient");
    }
}
