//! Corpus runs folded into a batch report

mod common;

use common::*;
use octofhir_invariants::{
    BatchConfig, BatchReport, ConstraintRepository, ExpectedDiagnostics, ProfileDifferential,
    Severity, validate,
};
use pretty_assertions::assert_eq;

const POSTAL_CODE: &str = "address.postalCode.all(matches('[0-9]{5}(-[0-9]{4}){0,1}'))";

fn postal_address(code: &str) -> octofhir_invariants::ResourceNode {
    octofhir_invariants::ResourceNode::new("Address").with_child("postalCode", string(code))
}

#[test]
fn corpus_summary_names_failing_invariants() {
    let repository = ConstraintRepository::load_defaults().unwrap().freeze();
    let mut report = BatchReport::new(BatchConfig::default());

    for (name, contacts) in [
        ("patient-a", vec![(true, true)]),
        ("patient-b", vec![(false, false)]),
        ("patient-c", vec![]),
        ("patient-d", vec![(false, false), (true, false)]),
    ] {
        report.record(name, &validate(&repository, &patient_with_contacts(&contacts)));
    }

    assert_eq!(report.instances(), 4);
    assert_eq!(report.invalid(), ["patient-b", "patient-d"]);
    assert_eq!(report.failed_codes().get("pat-1"), Some(&2));
    assert_eq!(
        report.summary(),
        "Validation failed in 2 of 4 examples\nIssues with Invariant: pat-1 (2)"
    );
}

#[test]
fn allowlisted_postal_code_rule_does_not_fail_instances() {
    let mut repository = ConstraintRepository::load_defaults().unwrap();
    repository
        .merge_profile(&[ProfileDifferential::new("Patient").with_constraint(
            "Patient",
            "us-postal",
            Severity::Error,
            POSTAL_CODE,
        )])
        .unwrap();
    let repository = repository.freeze();

    let patient = patient_with_contacts(&[(true, true)])
        .with_children("address", vec![postal_address("1234AB")]);
    let outcome = validate(&repository, &patient);
    assert_eq!(outcome.errors(), 1);
    assert_eq!(outcome.issues()[0].diagnostics, format!("Patient: {POSTAL_CODE}"));

    let mut strict = BatchReport::new(BatchConfig::default());
    strict.record("dutch-patient", &outcome);
    assert_eq!(strict.invalid(), ["dutch-patient"]);

    let mut lenient = BatchReport::new(BatchConfig {
        expected_diagnostics: ExpectedDiagnostics::new([POSTAL_CODE]),
    });
    lenient.record("dutch-patient", &outcome);
    assert!(lenient.invalid().is_empty());

    let us_patient = patient_with_contacts(&[(true, true)])
        .with_children("address", vec![postal_address("12345-6789")]);
    assert!(validate(&repository, &us_patient).is_empty());
}

#[test]
fn configuration_loads_from_json() {
    let config: BatchConfig = serde_json::from_value(serde_json::json!({
        "expected_diagnostics": [POSTAL_CODE]
    }))
    .unwrap();
    assert_eq!(config.expected_diagnostics, ExpectedDiagnostics::new([POSTAL_CODE]));

    let config: BatchConfig = serde_json::from_str("{}").unwrap();
    assert!(config.expected_diagnostics.is_empty());
}

#[test]
fn core_rules_audit_clean() {
    let repository = ConstraintRepository::load_defaults().unwrap().freeze();
    let mut report = BatchReport::new(BatchConfig::default());
    let findings = report.audit_rules(&repository);
    assert!(findings.is_empty(), "{findings:?}");
}
