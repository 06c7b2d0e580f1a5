//! Constraint rules and the per-type repository

pub mod builtin;
pub mod profile;
pub mod repository;
pub mod rule;

pub use builtin::{BUILTIN_INVARIANTS, BuiltinInvariant};
pub use profile::{ElementConstraint, ElementDefinition, ProfileDifferential};
pub use repository::{CompiledRepository, CompiledRule, ConstraintRepository, MergeStats};
pub use rule::{ConstraintRule, RuleOrigin, Severity};
