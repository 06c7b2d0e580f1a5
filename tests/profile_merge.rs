//! Merging profile differentials into the constraint repository

mod common;

use common::*;
use octofhir_invariants::{
    ConfigError, ConstraintRepository, MergeStats, ProfileDifferential, ResourceNode, RuleOrigin,
    Severity, validate,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn differential(value: serde_json::Value) -> ProfileDifferential {
    serde_json::from_value(value).expect("valid differential")
}

#[test]
fn nested_element_rule_is_scoped_to_its_path() {
    let mut repository = ConstraintRepository::new();
    repository
        .merge_profile(&[ProfileDifferential::new("Patient").with_constraint(
            "Patient.contact",
            "my-1",
            Severity::Error,
            "name.exists()",
        )])
        .unwrap();

    let rules = repository.rules_for("Patient");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].expression, "contact.all(name.exists())");
    assert_eq!(rules[0].scope.as_deref(), Some("contact"));
    assert_eq!(rules[0].origin, RuleOrigin::Profile);
}

#[rstest]
#[case("Patient", "name.exists()", "name.exists()")]
#[case("Patient.contact", "name.exists()", "contact.all(name.exists())")]
#[case("Patient.deceased[x]", "$this is Boolean", "deceased.all($this is Boolean)")]
#[case("Patient.contact.name", "family.exists()", "contact.name.all(family.exists())")]
fn element_paths_rewrite(#[case] path: &str, #[case] expression: &str, #[case] expected: &str) {
    let mut repository = ConstraintRepository::new();
    repository
        .merge_profile(&[ProfileDifferential::new("Patient").with_constraint(
            path,
            "rw-1",
            Severity::Error,
            expression,
        )])
        .unwrap();
    assert_eq!(repository.rules_for("Patient")[0].expression, expected);
}

#[test]
fn colliding_keys_keep_the_first_definition() {
    let first = differential(json!({
        "url": "http://example.org/StructureDefinition/first",
        "type": "Patient",
        "element": [{
            "path": "Patient",
            "constraint": [{ "key": "shared-1", "severity": "error", "human": "first", "expression": "active.exists()" }]
        }]
    }));
    let second = differential(json!({
        "url": "http://example.org/StructureDefinition/second",
        "type": "Patient",
        "element": [{
            "path": "Patient",
            "constraint": [{ "key": "shared-1", "severity": "warning", "human": "second", "expression": "gender.exists()" }]
        }]
    }));

    let mut repository = ConstraintRepository::new();
    let stats = repository.merge_profile(&[first]).unwrap();
    assert_eq!(stats.added, 1);
    let stats = repository.merge_profile(&[second]).unwrap();
    assert_eq!(
        stats,
        MergeStats {
            added: 0,
            dropped: 1,
            skipped: 0
        }
    );

    let rules = repository.rules_for("Patient");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].expression, "active.exists()");
    assert_eq!(rules[0].severity, Severity::Error);
    assert_eq!(rules[0].description, "first");
}

#[test]
fn profile_rules_cannot_replace_core_rules() {
    let mut repository = ConstraintRepository::load_defaults().unwrap();
    let stats = repository
        .merge_profile(&[ProfileDifferential::new("Patient").with_constraint(
            "Patient.contact",
            "pat-1",
            Severity::Warning,
            "true",
        )])
        .unwrap();
    assert_eq!(stats.dropped, 1);

    let rule = &repository.rules_for("Patient")[0];
    assert_eq!(rule.origin, RuleOrigin::Base);
    assert_eq!(rule.severity, Severity::Error);
}

#[rstest]
#[case(".contact")]
#[case("")]
#[case("Patient.")]
fn paths_without_type_are_rejected(#[case] path: &str) {
    let mut repository = ConstraintRepository::load_defaults().unwrap();
    let before: Vec<_> = repository.rules_for("Patient").to_vec();

    let result = repository.merge_profile(&[ProfileDifferential::new("Patient")
        .with_constraint("Patient", "ok-1", Severity::Error, "active.exists()")
        .with_constraint(path, "bad-1", Severity::Error, "name.exists()")]);

    assert_eq!(
        result,
        Err(ConfigError::MissingTypeQualifier {
            key: "bad-1".to_string(),
            path: path.to_string(),
        })
    );
    assert_eq!(repository.rules_for("Patient"), before.as_slice());
}

#[test]
fn merged_rules_take_part_in_validation() {
    let mut repository = ConstraintRepository::load_defaults().unwrap();
    repository
        .merge_profile(&[differential(json!({
            "type": "Patient",
            "element": [
                {
                    "path": "Patient.contact",
                    "constraint": [{
                        "key": "contact-phone",
                        "severity": "warning",
                        "human": "contacts should have a phone",
                        "expression": "telecom.where(system = 'phone').exists()"
                    }]
                },
                {
                    "path": "Patient.name",
                    "constraint": [{ "key": "name-doc", "severity": "error", "human": "documentation only" }]
                }
            ]
        }))])
        .unwrap();
    let repository = repository.freeze();

    let outcome = validate(&repository, &patient_with_contacts(&[(true, false), (true, true)]));
    assert_eq!(outcome.warnings(), 1);
    assert!(outcome.is_valid());
    assert_eq!(outcome.issues()[0].code, "contact-phone");
    assert_eq!(
        outcome.issues()[0].diagnostics,
        "Patient: contact.all(telecom.where(system = 'phone').exists())"
    );

    let clean = ResourceNode::new("Patient").with_child("name", human_name("Doe"));
    assert!(validate(&repository, &clean).is_empty());
}
