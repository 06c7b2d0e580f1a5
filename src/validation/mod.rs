//! Validation runs and their results

pub mod batch;
pub mod outcome;
pub mod validator;

pub use batch::{BatchConfig, BatchReport, ExpectedDiagnostics, RuleFinding};
pub use outcome::{Issue, Outcome};
pub use validator::{DEADLINE_CODE, InvariantValidator, ValidatorConfig, validate};
