//! Invariant expression evaluator
//!
//! Walks a [`CompiledExpression`](crate::compiler::CompiledExpression) against one
//! node of an instance tree. Evaluation never panics on bad data: type errors,
//! ambiguous singletons and similar problems come back as [`EvaluationError`].

mod context;
mod engine;
mod error;
mod functions;
mod operators;

pub use context::EvaluationContext;
pub use engine::{evaluate, evaluate_boolean};
pub use error::{EvaluationError, EvaluationResult};
