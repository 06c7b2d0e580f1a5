//! Invariants packaged with the engine
//!
//! A selection of core resource and data type invariants. Paths name the
//! element the invariant is declared on; nested paths are scoped the same way
//! profile constraints are.

use super::rule::Severity;

/// Packaged invariant: element path, key, severity, expression, description
pub type BuiltinInvariant = (&'static str, &'static str, Severity, &'static str, &'static str);

/// Core invariants loaded by `ConstraintRepository::load_defaults`
pub const BUILTIN_INVARIANTS: &[BuiltinInvariant] = &[
    (
        "Patient.contact",
        "pat-1",
        Severity::Error,
        "name.exists() or telecom.exists() or address.exists() or organization.exists()",
        "SHALL at least contain a contact's details or a reference to an organization",
    ),
    (
        "Observation",
        "obs-6",
        Severity::Error,
        "dataAbsentReason.empty() or value.empty()",
        "dataAbsentReason SHALL only be present if Observation.value[x] is not present",
    ),
    (
        "Observation.referenceRange",
        "obs-3",
        Severity::Error,
        "low.exists() or high.exists() or text.exists()",
        "Must have at least a low or a high or text",
    ),
    (
        "Bundle",
        "bdl-1",
        Severity::Error,
        "total.empty() or (type = 'searchset') or (type = 'history')",
        "total only when a search or history",
    ),
    (
        "Bundle",
        "bdl-2",
        Severity::Error,
        "entry.search.empty() or (type = 'searchset')",
        "entry.search only when a search",
    ),
    (
        "Bundle.entry",
        "bdl-5",
        Severity::Error,
        "resource.exists() or request.exists() or response.exists()",
        "must be a resource unless there's a request or response",
    ),
    (
        "Extension",
        "ext-1",
        Severity::Error,
        "extension.exists() != value.exists()",
        "Must have either extensions or value[x], not both",
    ),
    (
        "Quantity",
        "qty-3",
        Severity::Error,
        "code.empty() or system.exists()",
        "If a code for the unit is present, the system SHALL also be present",
    ),
    (
        "Period",
        "per-1",
        Severity::Error,
        "start.hasValue().not() or end.hasValue().not() or (start <= end)",
        "If present, start SHALL have a lower value than end",
    ),
    (
        "Range",
        "rng-2",
        Severity::Error,
        "low.empty() or high.empty() or (low.value <= high.value)",
        "If present, low SHALL have a lower value than high",
    ),
    (
        "Ratio",
        "rat-1",
        Severity::Error,
        "(numerator.empty() xor denominator.exists()) and (numerator.exists() or extension.exists())",
        "Numerator and denominator SHALL both be present, or both are absent",
    ),
    (
        "Attachment",
        "att-1",
        Severity::Error,
        "data.empty() or contentType.exists()",
        "If the Attachment has data, it SHALL have a contentType",
    ),
    (
        "ContactPoint",
        "cpt-2",
        Severity::Error,
        "value.empty() or system.exists()",
        "A system is required if a value is provided.",
    ),
    (
        "Timing.repeat",
        "tim-1",
        Severity::Error,
        "duration.empty() or durationUnit.exists()",
        "if there's a duration, there needs to be duration units",
    ),
    (
        "Timing.repeat",
        "tim-2",
        Severity::Error,
        "period.empty() or periodUnit.exists()",
        "if there's a period, there needs to be period units",
    ),
];
