//! Expression compiler
//!
//! Turns constraint expression text into a [`CompiledExpression`]: the text is
//! parsed, then lowered into a typed tree that the evaluator walks directly.

pub mod cache;
pub mod error;
pub mod expression;
mod lowering;
pub mod pattern;

pub use cache::ExpressionCache;
pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use expression::{
    CompiledExpression, ContextVariable, Expr, Function, Pattern, TypeSpecifier, TypeTestMode,
};

use crate::parser::parse;

/// Compile expression text into its reusable evaluable form
pub fn compile(text: &str) -> CompileResult<CompiledExpression> {
    let ast = parse(text).map_err(|e| CompileError::new(text, e))?;
    let root = lowering::lower(&ast).map_err(|kind| CompileError::new(text, kind))?;
    log::trace!("compiled expression '{text}'");
    Ok(CompiledExpression::new(text, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseError;

    #[test]
    fn compile_errors_carry_the_text() {
        let error = compile("name.exists(").unwrap_err();
        assert_eq!(error.expression, "name.exists(");
        assert!(matches!(
            error.kind,
            CompileErrorKind::Parse(ParseError::UnexpectedEndOfInput { .. })
        ));
        assert!(error.to_string().starts_with("failed to compile 'name.exists('"));
    }

    #[test]
    fn compiled_expressions_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledExpression>();

        let compiled = compile("contact.all(name.exists())").unwrap();
        let copy = compiled.clone();
        assert_eq!(copy.source(), "contact.all(name.exists())");
        assert_eq!(compiled.member_names(), vec!["contact", "name"]);
        assert!(!compiled.references_parent());
    }

    #[test]
    fn parent_references_are_detected() {
        assert!(compile("$parent.type = 'x'").unwrap().references_parent());
        let compiled = compile("value is Quantity or value.is(String)").unwrap();
        assert_eq!(
            compiled.type_tests(),
            vec![
                &TypeSpecifier::Named("Quantity".to_string()),
                &TypeSpecifier::System(crate::model::LiteralKind::String)
            ]
        );
    }
}
