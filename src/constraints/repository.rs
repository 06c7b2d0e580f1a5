//! Per-type constraint registry
//!
//! The repository is mutable only while it is being set up: built-in rules are
//! loaded, profile differentials merged, and then [`ConstraintRepository::freeze`]
//! compiles everything into a read-only [`CompiledRepository`] that validations
//! share.

use super::builtin::BUILTIN_INVARIANTS;
use super::profile::ProfileDifferential;
use super::rule::{ConstraintRule, RuleOrigin, Severity};
use crate::compiler::{CompileError, CompiledExpression, ExpressionCache};
use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;

/// Counts reported by a profile merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Rules stored
    pub added: usize,
    /// Rules discarded because their key was already registered for the type
    pub dropped: usize,
    /// Constraints without an expression
    pub skipped: usize,
}

/// Rules by type name, in registration order
#[derive(Debug, Clone, Default)]
pub struct ConstraintRepository {
    sets: IndexMap<String, Vec<ConstraintRule>>,
}

impl ConstraintRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding the packaged core invariants
    pub fn load_defaults() -> ConfigResult<Self> {
        Self::from_definitions(BUILTIN_INVARIANTS.iter().copied())
    }

    /// Repository built from (path, key, severity, expression, description) definitions
    ///
    /// Definitions on nested paths are scoped to that path, exactly like profile
    /// constraints.
    pub fn from_definitions<'d>(
        definitions: impl IntoIterator<Item = (&'d str, &'d str, Severity, &'d str, &'d str)>,
    ) -> ConfigResult<Self> {
        let mut repository = Self::new();
        for (path, key, severity, expression, description) in definitions {
            let (type_name, relative) = split_element_path(key, path)?;
            let mut rule = ConstraintRule::new(key, severity, expression, description);
            if let Some(relative) = relative {
                rule = rule.scoped_to(relative);
            }
            repository.insert(type_name, rule);
        }
        log::debug!(
            "loaded {} base rules for {} types",
            repository.rule_count(),
            repository.sets.len()
        );
        Ok(repository)
    }

    /// Merge the constraints of profile differentials
    ///
    /// Every path is checked before anything is stored, so a failing call leaves
    /// the repository untouched. Keys already registered for a type keep their
    /// first definition; later ones are dropped.
    pub fn merge_profile(&mut self, differentials: &[ProfileDifferential]) -> ConfigResult<MergeStats> {
        let mut stats = MergeStats::default();
        let mut staged = Vec::new();

        for differential in differentials {
            log::trace!(
                "staging constraints of {}",
                differential.url.as_deref().unwrap_or(&differential.type_name)
            );
            for element in &differential.elements {
                for constraint in &element.constraints {
                    let Some(expression) = constraint
                        .expression
                        .as_deref()
                        .filter(|expression| !expression.trim().is_empty())
                    else {
                        stats.skipped += 1;
                        continue;
                    };

                    let (type_name, relative) = split_element_path(&constraint.key, &element.path)?;
                    if type_name != differential.type_name {
                        return Err(ConfigError::TypeMismatch {
                            key: constraint.key.clone(),
                            path: element.path.clone(),
                            expected: differential.type_name.clone(),
                        });
                    }

                    let mut rule = ConstraintRule::new(
                        constraint.key.as_str(),
                        constraint.severity,
                        expression,
                        constraint.human.as_str(),
                    )
                    .with_origin(RuleOrigin::Profile);
                    if let Some(relative) = relative {
                        rule = rule.scoped_to(relative);
                    }
                    staged.push((differential.type_name.as_str(), rule));
                }
            }
        }

        for (type_name, rule) in staged {
            if self.insert(type_name, rule) {
                stats.added += 1;
            } else {
                stats.dropped += 1;
            }
        }
        log::debug!(
            "merged {} profile(s): {} added, {} dropped, {} skipped",
            differentials.len(),
            stats.added,
            stats.dropped,
            stats.skipped
        );
        Ok(stats)
    }

    /// Store a rule unless its key is already registered for the type
    fn insert(&mut self, type_name: &str, rule: ConstraintRule) -> bool {
        let rules = self.sets.entry(type_name.to_string()).or_default();
        if let Some(existing) = rules.iter().find(|existing| existing.key == rule.key) {
            log::debug!(
                "dropping {} for {type_name}: key already defined as '{}'",
                rule.key,
                existing.expression
            );
            return false;
        }
        rules.push(rule);
        true
    }

    /// Rules for a type in registration order; empty when the type has none
    pub fn rules_for(&self, type_name: &str) -> &[ConstraintRule] {
        self.sets.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Types with at least one rule, in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.sets
            .iter()
            .filter(|(_, rules)| !rules.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Total number of rules
    pub fn rule_count(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    /// Compile every rule and make the repository read-only
    pub fn freeze(self) -> CompiledRepository {
        let mut cache = ExpressionCache::new();
        let sets: IndexMap<String, Vec<CompiledRule>> = self
            .sets
            .into_iter()
            .map(|(type_name, rules)| {
                let compiled = rules
                    .into_iter()
                    .map(|rule| CompiledRule {
                        compiled: cache.get_or_compile(&rule.expression),
                        rule,
                    })
                    .collect();
                (type_name, compiled)
            })
            .collect();

        let repository = CompiledRepository { sets };
        log::debug!(
            "froze repository: {} rules, {} distinct expressions, {} failed to compile",
            repository.rule_count(),
            cache.len(),
            repository.compile_failures().count()
        );
        repository
    }
}

/// Split `Type.relative.path` into the type and the relative path
///
/// Choice markers (`[x]`) are removed from the relative path.
fn split_element_path<'p>(key: &str, path: &'p str) -> ConfigResult<(&'p str, Option<String>)> {
    let missing = || ConfigError::MissingTypeQualifier {
        key: key.to_string(),
        path: path.to_string(),
    };
    let (type_name, relative) = match path.split_once('.') {
        Some((type_name, relative)) => (type_name, Some(relative)),
        None => (path, None),
    };
    if type_name.trim().is_empty() {
        return Err(missing());
    }
    match relative {
        None => Ok((type_name, None)),
        Some(relative) => {
            let relative = relative.replace("[x]", "");
            if relative.is_empty() {
                return Err(missing());
            }
            Ok((type_name, Some(relative)))
        }
    }
}

/// A rule together with its compiled expression
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// The rule as registered
    pub rule: ConstraintRule,
    /// Compiled expression, or why compiling failed
    pub compiled: Result<CompiledExpression, CompileError>,
}

/// Frozen repository shared by validations
///
/// Immutable after construction; share it by reference or `Arc` across threads.
#[derive(Debug, Clone, Default)]
pub struct CompiledRepository {
    sets: IndexMap<String, Vec<CompiledRule>>,
}

impl CompiledRepository {
    /// Compiled rules for a type in registration order; empty when the type has none
    pub fn rules_for(&self, type_name: &str) -> &[CompiledRule] {
        self.sets.get(type_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Types with at least one rule
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Total number of rules
    pub fn rule_count(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    /// Rules whose expression failed to compile, with their type
    pub fn compile_failures(&self) -> impl Iterator<Item = (&str, &CompiledRule)> {
        self.sets.iter().flat_map(|(type_name, rules)| {
            rules
                .iter()
                .filter(|rule| rule.compiled.is_err())
                .map(move |rule| (type_name.as_str(), rule))
        })
    }

    /// Every rule with its type, in registration order
    pub fn rules(&self) -> impl Iterator<Item = (&str, &CompiledRule)> {
        self.sets
            .iter()
            .flat_map(|(type_name, rules)| rules.iter().map(move |rule| (type_name.as_str(), rule)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expressions(repository: &ConstraintRepository, type_name: &str) -> Vec<String> {
        repository
            .rules_for(type_name)
            .iter()
            .map(|rule| rule.expression.clone())
            .collect()
    }

    #[test]
    fn defaults_load_and_compile() {
        let repository = ConstraintRepository::load_defaults().unwrap();
        assert!(repository.rule_count() >= 10);
        assert_eq!(
            expressions(&repository, "Patient"),
            vec![
                "contact.all(name.exists() or telecom.exists() or address.exists() or organization.exists())"
            ]
        );
        assert!(repository.rules_for("Narrative").is_empty());
        assert!(repository.type_names().any(|name| name == "Patient"));
        assert!(!repository.type_names().any(|name| name == "Narrative"));

        let type_count = repository.type_names().count();
        let compiled = repository.freeze();
        assert_eq!(compiled.compile_failures().count(), 0);
        assert_eq!(compiled.type_names().count(), type_count);
    }

    #[test]
    fn nested_paths_are_scoped_and_choice_markers_stripped() {
        let mut repository = ConstraintRepository::new();
        let differential = ProfileDifferential::new("Observation")
            .with_constraint("Observation.value[x]", "v-1", Severity::Error, "code.exists()")
            .with_constraint("Observation.component.value[x]", "v-2", Severity::Error, "unit.exists()");
        repository.merge_profile(&[differential]).unwrap();

        let rules = repository.rules_for("Observation");
        assert_eq!(rules[0].expression, "value.all(code.exists())");
        assert_eq!(rules[0].scope.as_deref(), Some("value"));
        assert_eq!(rules[0].origin, RuleOrigin::Profile);
        assert_eq!(rules[1].expression, "component.value.all(unit.exists())");
    }

    #[test]
    fn first_registered_key_wins() {
        let mut repository = ConstraintRepository::new();
        let first = ProfileDifferential::new("Patient")
            .with_constraint("Patient", "dup-1", Severity::Error, "name.exists()");
        let second = ProfileDifferential::new("Patient")
            .with_constraint("Patient", "dup-1", Severity::Error, "birthDate.exists()");

        let stats = repository.merge_profile(&[first, second]).unwrap();
        assert_eq!(
            stats,
            MergeStats {
                added: 1,
                dropped: 1,
                skipped: 0
            }
        );
        assert_eq!(expressions(&repository, "Patient"), vec!["name.exists()"]);
    }

    #[test]
    fn constraints_without_expression_are_skipped() {
        let mut differential = ProfileDifferential::new("Patient");
        differential.elements.push(crate::constraints::ElementDefinition {
            path: "Patient.name".to_string(),
            constraints: vec![crate::constraints::ElementConstraint {
                key: "x-1".to_string(),
                severity: Severity::Error,
                human: String::new(),
                expression: None,
            }],
        });
        let mut repository = ConstraintRepository::new();
        let stats = repository.merge_profile(&[differential]).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(repository.rule_count(), 0);
    }

    #[test]
    fn failed_merges_leave_state_untouched() {
        let mut repository = ConstraintRepository::load_defaults().unwrap();
        let before = repository.rule_count();

        let bad = ProfileDifferential::new("Patient")
            .with_constraint("Patient", "ok-1", Severity::Error, "name.exists()")
            .with_constraint(".name", "bad-1", Severity::Error, "given.exists()");
        assert_eq!(
            repository.merge_profile(&[bad]),
            Err(ConfigError::MissingTypeQualifier {
                key: "bad-1".to_string(),
                path: ".name".to_string(),
            })
        );

        let wrong_type = ProfileDifferential::new("Patient")
            .with_constraint("Observation.code", "bad-2", Severity::Error, "coding.exists()");
        assert!(matches!(
            repository.merge_profile(&[wrong_type]),
            Err(ConfigError::TypeMismatch { .. })
        ));

        assert_eq!(repository.rule_count(), before);
        assert!(repository.rules_for("Patient").iter().all(|rule| rule.key != "ok-1"));
    }

    #[test]
    fn freezing_keeps_compile_failures() {
        let repository = ConstraintRepository::from_definitions([
            ("Basic", "ok-1", Severity::Error, "code.exists()", ""),
            ("Basic", "bad-1", Severity::Error, "code.exists(", ""),
        ])
        .unwrap()
        .freeze();

        let rules = repository.rules_for("Basic");
        assert_eq!(rules.len(), 2);
        assert!(rules[0].compiled.is_ok());
        let failures: Vec<_> = repository
            .compile_failures()
            .map(|(type_name, rule)| (type_name, rule.rule.key.as_str()))
            .collect();
        assert_eq!(failures, vec![("Basic", "bad-1")]);
    }

    #[test]
    fn built_in_paths_need_a_type() {
        assert!(matches!(
            ConstraintRepository::from_definitions([("", "x-1", Severity::Error, "true", "")]),
            Err(ConfigError::MissingTypeQualifier { .. })
        ));
    }
}
