// Error types for invariant evaluation

use thiserror::Error;

/// Result type for evaluation operations
pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Faults that stop one expression from producing a result
///
/// These never escape a validation run; the validator turns them into Fatal issues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Operands of incompatible kinds
    #[error("type mismatch: cannot apply '{operation}' to {left} and {right}")]
    TypeMismatch {
        /// Operator or function
        operation: String,
        /// Left operand type
        left: String,
        /// Right operand type
        right: String,
    },

    /// More than one item where a single value is required
    #[error("{context} requires a single item, got {count}")]
    NotSingleton {
        /// Position that required a singleton
        context: String,
        /// Number of items found
        count: usize,
    },

    /// Path segment applied to a primitive value
    #[error("cannot navigate to '{member}' on a {type_name} value")]
    InvalidNavigation {
        /// Segment name
        member: String,
        /// Type of the primitive
        type_name: String,
    },

    /// Regular expression computed at evaluation time that does not compile
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// Pattern text
        pattern: String,
        /// Regex engine message
        message: String,
    },

    /// Integer arithmetic outside the 64-bit range
    #[error("arithmetic overflow in '{operation}'")]
    ArithmeticOverflow {
        /// Operator
        operation: String,
    },

    /// Invalid operation
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Error message
        message: String,
    },
}

impl EvaluationError {
    /// Type mismatch between two operand type names
    pub fn type_mismatch(
        operation: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            operation: operation.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    /// Invalid operation with a message
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
