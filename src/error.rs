//! Error types for repository construction
//!
//! Only configuration problems surface as errors; anything that goes wrong while
//! validating an instance is reported as an issue in the outcome.

use thiserror::Error;

/// Result type alias for repository construction
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Problem in built-in or profile constraint definitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Element path that does not start with a type name
    #[error("constraint '{key}' has element path '{path}' without a type qualifier")]
    MissingTypeQualifier {
        /// Constraint key
        key: String,
        /// Element path as supplied
        path: String,
    },

    /// Element path whose type differs from the definition's type
    #[error("constraint '{key}' on '{path}' does not belong to type '{expected}'")]
    TypeMismatch {
        /// Constraint key
        key: String,
        /// Element path as supplied
        path: String,
        /// Type the definition constrains
        expected: String,
    },
}
