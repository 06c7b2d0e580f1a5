//! FHIR invariant validation in Rust
//!
//! Checks instance trees against invariant rules: FHIRPath expressions attached
//! to element types. Rules come packaged with the crate or from profile
//! differentials, are compiled once into a frozen repository, and are evaluated
//! on every node of a tree. Rules that are broken or cannot be evaluated are
//! reported as Fatal issues instead of aborting the run.
//!
//! ```
//! use octofhir_invariants::{ConstraintRepository, ResourceNode, validate};
//!
//! let repository = ConstraintRepository::load_defaults()?.freeze();
//! let patient = ResourceNode::new("Patient")
//!     .with_children("contact", vec![ResourceNode::new("BackboneElement")]);
//!
//! let outcome = validate(&repository, &patient);
//! assert_eq!(outcome.errors(), 1);
//! assert_eq!(outcome.issues()[0].code, "pat-1");
//! # Ok::<(), octofhir_invariants::ConfigError>(())
//! ```

pub mod ast;
pub mod compiler;
pub mod constraints;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod validation;

// Re-export main types
pub use compiler::{CompileError, CompiledExpression, ExpressionCache, compile};
pub use constraints::{
    CompiledRepository, ConstraintRepository, ConstraintRule, MergeStats, ProfileDifferential,
    RuleOrigin, Severity,
};
pub use error::{ConfigError, ConfigResult};
pub use evaluator::{EvaluationContext, EvaluationError, evaluate};
pub use model::{PrimitiveValue, ResourceNode, Value};
pub use parser::{ParseError, parse};
pub use validation::{
    BatchConfig, BatchReport, ExpectedDiagnostics, InvariantValidator, Issue, Outcome,
    ValidatorConfig, validate,
};
