//! Invariant Validation Benchmarks
//!
//! Measures the three phases of a validation run:
//! - compiling rule expressions
//! - freezing a repository with the core invariants
//! - validating synthetic bundles of growing size

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use octofhir_invariants::{ConstraintRepository, ResourceNode, compile, validate};
use std::hint::black_box;

/// Rule expressions of increasing complexity
const RULE_EXPRESSIONS: &[(&str, &str)] = &[
    ("simple", "name.exists()"),
    (
        "scoped",
        "contact.all(name.exists() or telecom.exists() or address.exists() or organization.exists())",
    ),
    (
        "bundle",
        "entry.all(resource.exists() or request.exists() or response.exists())",
    ),
    (
        "pattern",
        "address.postalCode.all(matches('[0-9]{5}(-[0-9]{4}){0,1}'))",
    ),
];

fn generate_patient(index: usize) -> ResourceNode {
    let mut contact = ResourceNode::new("BackboneElement")
        .with_child("name", ResourceNode::new("HumanName").with_child("family", text("Contact")));
    if index % 2 == 0 {
        contact.add_child(
            "telecom",
            ResourceNode::new("ContactPoint")
                .with_child("system", ResourceNode::primitive("code", "phone"))
                .with_child("value", text("555-0100")),
        );
    }
    ResourceNode::new("Patient")
        .with_child("active", ResourceNode::primitive("boolean", true))
        .with_children(
            "name",
            vec![ResourceNode::new("HumanName").with_child("family", text(&format!("Doe{index}")))],
        )
        .with_children("contact", vec![contact])
}

fn generate_bundle(num_entries: usize) -> ResourceNode {
    let entries: Vec<_> = (0..num_entries)
        .map(|i| ResourceNode::new("BackboneElement").with_child("resource", generate_patient(i)))
        .collect();
    ResourceNode::new("Bundle")
        .with_child("type", ResourceNode::primitive("code", "collection"))
        .with_children("entry", entries)
}

fn text(value: &str) -> ResourceNode {
    ResourceNode::primitive("string", value)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, expression) in RULE_EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), expression, |b, expression| {
            b.iter(|| compile(black_box(expression)))
        });
    }
    group.finish();
}

fn bench_freeze(c: &mut Criterion) {
    c.bench_function("freeze_core_repository", |b| {
        b.iter(|| {
            let repository = ConstraintRepository::load_defaults().expect("core invariants load");
            black_box(repository.freeze())
        })
    });
}

fn bench_validate(c: &mut Criterion) {
    let repository = ConstraintRepository::load_defaults()
        .expect("core invariants load")
        .freeze();

    let mut group = c.benchmark_group("validate_bundle");
    for size in [10usize, 100, 1000] {
        let bundle = generate_bundle(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bundle, |b, bundle| {
            b.iter(|| validate(black_box(&repository), black_box(bundle)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_freeze, bench_validate);
criterion_main!(benches);
