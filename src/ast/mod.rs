//! Abstract Syntax Tree (AST) definitions for invariant expressions
//!
//! The parser produces these nodes; the compiler lowers them into the evaluable
//! form used by the validator. The AST keeps literals in their source spelling so
//! that lowering decides on exact numeric and temporal representations.

mod expression;
mod operator;

pub use expression::*;
pub use operator::*;
