//! Compilation error types

use crate::parser::ParseError;
use thiserror::Error;

/// Reason an expression could not be compiled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The text is not syntactically valid
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Function name outside the supported set
    #[error("unknown function '{name}'")]
    UnknownFunction {
        /// Function name as written
        name: String,
    },

    /// Wrong number of arguments
    #[error("function '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        /// Function name
        name: String,
        /// Accepted argument count, rendered (`1`, `0..1`)
        expected: String,
        /// Supplied argument count
        actual: usize,
    },

    /// Literal text that does not denote a value
    #[error("invalid {literal_type} literal '{value}'")]
    InvalidLiteral {
        /// Literal kind
        literal_type: String,
        /// Offending text
        value: String,
    },

    /// Regular expression that does not compile
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern as written
        pattern: String,
        /// Regex engine message
        message: String,
    },

    /// `%name` that is not a known environment constant
    #[error("unknown environment constant '%{name}'")]
    UnknownConstant {
        /// Constant name
        name: String,
    },

    /// Type specifier argument that is not a (qualified) name
    #[error("expected a type name, found {found}")]
    ExpectedTypeName {
        /// Rendering of the argument
        found: String,
    },

    /// Syntax the engine recognises but does not evaluate
    #[error("unsupported construct: {construct}")]
    Unsupported {
        /// Description of the construct
        construct: String,
    },
}

/// Expression that failed to compile, with its raw text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to compile '{expression}': {kind}")]
pub struct CompileError {
    /// Raw expression text
    pub expression: String,
    /// Reason
    #[source]
    pub kind: CompileErrorKind,
}

impl CompileError {
    /// Attach the raw expression text to a reason
    pub fn new(expression: impl Into<String>, kind: impl Into<CompileErrorKind>) -> Self {
        Self {
            expression: expression.into(),
            kind: kind.into(),
        }
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
