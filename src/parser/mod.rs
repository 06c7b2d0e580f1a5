//! Invariant expression parser
//!
//! Converts expression text into an Abstract Syntax Tree (AST) using a
//! hand-written tokenizer and a Pratt parser.

#![warn(missing_docs)]

pub mod error;
pub mod pratt;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::{MAX_NESTING_DEPTH, parse};
