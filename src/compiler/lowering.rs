//! Lowering from the syntax tree to the compiled form
//!
//! Everything that can be decided without an instance tree is decided here:
//! literals are typed, functions, constants and type names are resolved, and
//! literal regex patterns are compiled.

use super::error::CompileErrorKind;
use super::expression::{ContextVariable, Expr, Function, Pattern, TypeSpecifier, TypeTestMode};
use super::pattern::compile_pattern;
use crate::ast::{ExpressionNode, LiteralValue, UnaryOperator};
use crate::model::PrimitiveValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

type LowerResult<T> = Result<T, CompileErrorKind>;

/// Lower a parsed expression
pub(crate) fn lower(node: &ExpressionNode) -> LowerResult<Expr> {
    match node {
        ExpressionNode::Literal(literal) => lower_literal(literal),

        ExpressionNode::Identifier(name) => Ok(Expr::Member {
            base: None,
            name: name.clone(),
        }),

        ExpressionNode::Path { base, path } => Ok(Expr::Member {
            base: Some(Box::new(lower(base)?)),
            name: path.clone(),
        }),

        ExpressionNode::BinaryOp(data) => Ok(Expr::Binary {
            op: data.op,
            left: Box::new(lower(&data.left)?),
            right: Box::new(lower(&data.right)?),
        }),

        ExpressionNode::UnaryOp { op, operand } => lower_unary(*op, operand),

        ExpressionNode::FunctionCall(call) => lower_call(None, &call.name, &call.args),

        ExpressionNode::MethodCall(call) => {
            let base = lower(&call.base)?;
            lower_call(Some(base), &call.method, &call.args)
        }

        ExpressionNode::Index { base, index } => Ok(Expr::Index {
            base: Box::new(lower(base)?),
            index: Box::new(lower(index)?),
        }),

        ExpressionNode::TypeCheck {
            expression,
            type_name,
        } => Ok(Expr::TypeTest {
            base: Some(Box::new(lower(expression)?)),
            target: TypeSpecifier::resolve(type_name),
            mode: TypeTestMode::Is,
        }),

        ExpressionNode::TypeCast {
            expression,
            type_name,
        } => Ok(Expr::TypeTest {
            base: Some(Box::new(lower(expression)?)),
            target: TypeSpecifier::resolve(type_name),
            mode: TypeTestMode::As,
        }),

        ExpressionNode::Variable(name) => lower_variable(name),
    }
}

fn lower_literal(literal: &LiteralValue) -> LowerResult<Expr> {
    let value = match literal {
        LiteralValue::Null => return Ok(Expr::Empty),
        LiteralValue::Boolean(b) => PrimitiveValue::Boolean(*b),
        LiteralValue::Integer(i) => PrimitiveValue::Integer(*i),
        LiteralValue::String(s) => PrimitiveValue::String(s.clone()),
        LiteralValue::Decimal(text) => {
            PrimitiveValue::Decimal(Decimal::from_str(text).map_err(|_| invalid("decimal", text))?)
        }
        LiteralValue::Date(text) => PrimitiveValue::Date(parse_date(text)?),
        LiteralValue::DateTime(text) => PrimitiveValue::DateTime(parse_date_time(text)?),
    };
    Ok(Expr::Literal(value))
}

/// Full-precision dates only; `@2014` and `@2014-05` are rejected
fn parse_date(text: &str) -> LowerResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid("date", text))
}

/// Date-times without an offset are read as UTC
fn parse_date_time(text: &str) -> LowerResult<DateTime<chrono::FixedOffset>> {
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Ok(value);
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| invalid("dateTime", text))
}

fn invalid(literal_type: &str, value: &str) -> CompileErrorKind {
    CompileErrorKind::InvalidLiteral {
        literal_type: literal_type.to_string(),
        value: value.to_string(),
    }
}

/// Negative numeric literals fold into the literal itself
fn lower_unary(op: UnaryOperator, operand: &ExpressionNode) -> LowerResult<Expr> {
    let operand = lower(operand)?;
    match (op, operand) {
        (UnaryOperator::Negate, Expr::Literal(PrimitiveValue::Integer(i))) => i
            .checked_neg()
            .map(|value| Expr::Literal(PrimitiveValue::Integer(value)))
            .ok_or_else(|| invalid("integer", &format!("-{i}"))),
        (UnaryOperator::Negate, Expr::Literal(PrimitiveValue::Decimal(d))) => {
            Ok(Expr::Literal(PrimitiveValue::Decimal(-d)))
        }
        (op, operand) => Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        }),
    }
}

fn lower_variable(name: &str) -> LowerResult<Expr> {
    match name {
        "index" | "total" => Err(CompileErrorKind::Unsupported {
            construct: format!("${name}"),
        }),
        _ => ContextVariable::from_name(name)
            .map(Expr::Variable)
            .ok_or_else(|| CompileErrorKind::UnknownConstant {
                name: name.to_string(),
            }),
    }
}

fn lower_call(base: Option<Expr>, name: &str, args: &[ExpressionNode]) -> LowerResult<Expr> {
    let base = base.map(Box::new);
    match name {
        "matches" => {
            check_arity(name, (1, 1), args.len())?;
            let pattern = match &args[0] {
                ExpressionNode::Literal(LiteralValue::String(pattern)) => Pattern::Compiled(
                    compile_pattern(pattern).map_err(|e| CompileErrorKind::InvalidRegex {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?,
                ),
                other => Pattern::Dynamic(Box::new(lower(other)?)),
            };
            Ok(Expr::Matches { base, pattern })
        }

        "is" | "as" | "ofType" => {
            check_arity(name, (1, 1), args.len())?;
            let type_name =
                args[0]
                    .as_qualified_name()
                    .ok_or_else(|| CompileErrorKind::ExpectedTypeName {
                        found: describe(&args[0]).to_string(),
                    })?;
            let mode = match name {
                "is" => TypeTestMode::Is,
                "as" => TypeTestMode::As,
                _ => TypeTestMode::OfType,
            };
            Ok(Expr::TypeTest {
                base,
                target: TypeSpecifier::resolve(&type_name),
                mode,
            })
        }

        _ => {
            let function =
                Function::from_name(name).ok_or_else(|| CompileErrorKind::UnknownFunction {
                    name: name.to_string(),
                })?;
            check_arity(name, function.arity(), args.len())?;
            let args = args.iter().map(lower).collect::<LowerResult<Vec<_>>>()?;
            Ok(Expr::Call {
                base,
                function,
                args,
            })
        }
    }
}

fn check_arity(name: &str, (min, max): (usize, usize), actual: usize) -> LowerResult<()> {
    if (min..=max).contains(&actual) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min}..{max}")
    };
    Err(CompileErrorKind::Arity {
        name: name.to_string(),
        expected,
        actual,
    })
}

fn describe(node: &ExpressionNode) -> &'static str {
    match node {
        ExpressionNode::Literal(_) => "a literal",
        ExpressionNode::Identifier(_) | ExpressionNode::Path { .. } => "a path",
        ExpressionNode::BinaryOp(_) | ExpressionNode::UnaryOp { .. } => "an operator expression",
        ExpressionNode::FunctionCall(_) | ExpressionNode::MethodCall(_) => "a function call",
        ExpressionNode::Index { .. } => "an indexer",
        ExpressionNode::TypeCheck { .. } | ExpressionNode::TypeCast { .. } => "a type operator",
        ExpressionNode::Variable(_) => "a variable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOperator;
    use crate::model::LiteralKind;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn lower_text(text: &str) -> LowerResult<Expr> {
        lower(&parse(text).unwrap())
    }

    #[test]
    fn decimals_are_exact() {
        match lower_text("0.1").unwrap() {
            Expr::Literal(PrimitiveValue::Decimal(d)) => {
                assert_eq!(d, Decimal::from_str("0.1").unwrap())
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_literals_fold() {
        assert!(matches!(
            lower_text("-5").unwrap(),
            Expr::Literal(PrimitiveValue::Integer(-5))
        ));
        assert!(matches!(
            lower_text("-name.count()").unwrap(),
            Expr::Unary {
                op: UnaryOperator::Negate,
                ..
            }
        ));
    }

    #[test]
    fn date_literals_are_typed() {
        assert!(matches!(
            lower_text("@2020-02-29").unwrap(),
            Expr::Literal(PrimitiveValue::Date(_))
        ));
        assert!(matches!(
            lower_text("@2020-02-29T10:00:00").unwrap(),
            Expr::Literal(PrimitiveValue::DateTime(_))
        ));
        assert!(matches!(
            lower_text("@2021-02-30"),
            Err(CompileErrorKind::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn partial_dates_are_invalid_literals() {
        for (text, literal_type) in [
            ("@2014", "date"),
            ("@2014-05", "date"),
            ("@2014-05-01T10", "dateTime"),
        ] {
            assert_eq!(
                lower_text(text).unwrap_err(),
                CompileErrorKind::InvalidLiteral {
                    literal_type: literal_type.to_string(),
                    value: text[1..].to_string(),
                }
            );
        }
    }

    #[test]
    fn type_names_become_tags() {
        match lower_text("value is System.Decimal").unwrap() {
            Expr::TypeTest { target, mode, .. } => {
                assert_eq!(target, TypeSpecifier::System(LiteralKind::Decimal));
                assert_eq!(mode, TypeTestMode::Is);
            }
            other => panic!("unexpected {other:?}"),
        }
        match lower_text("value.ofType(FHIR.Quantity)").unwrap() {
            Expr::TypeTest { target, mode, .. } => {
                assert_eq!(target, TypeSpecifier::Named("Quantity".to_string()));
                assert_eq!(mode, TypeTestMode::OfType);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            lower_text("value.is('String')"),
            Err(CompileErrorKind::ExpectedTypeName { .. })
        ));
    }

    #[test]
    fn functions_are_resolved_and_checked() {
        assert!(matches!(
            lower_text("name.frobnicate()"),
            Err(CompileErrorKind::UnknownFunction { .. })
        ));
        assert_eq!(
            lower_text("name.exists(1, 2)").unwrap_err(),
            CompileErrorKind::Arity {
                name: "exists".to_string(),
                expected: "0..1".to_string(),
                actual: 2,
            }
        );
        assert!(matches!(
            lower_text("contact.all(name.exists())").unwrap(),
            Expr::Call {
                function: Function::All,
                ..
            }
        ));
    }

    #[test]
    fn literal_patterns_compile_eagerly() {
        assert!(matches!(
            lower_text("code.matches('[A-Z]+')").unwrap(),
            Expr::Matches {
                pattern: Pattern::Compiled(_),
                ..
            }
        ));
        assert!(matches!(
            lower_text("code.matches(system)").unwrap(),
            Expr::Matches {
                pattern: Pattern::Dynamic(_),
                ..
            }
        ));
        assert!(matches!(
            lower_text("code.matches('[A-Z')"),
            Err(CompileErrorKind::InvalidRegex { .. })
        ));
    }

    #[test]
    fn variables_resolve() {
        assert!(matches!(
            lower_text("$this").unwrap(),
            Expr::Variable(ContextVariable::This)
        ));
        assert!(matches!(
            lower_text("%rootResource").unwrap(),
            Expr::Variable(ContextVariable::Resource)
        ));
        assert!(matches!(
            lower_text("%`vs-administrative-gender`").unwrap(),
            Expr::Variable(ContextVariable::ValueSet(_))
        ));
        assert!(matches!(
            lower_text("%unknown"),
            Err(CompileErrorKind::UnknownConstant { .. })
        ));
        assert!(matches!(
            lower_text("$index"),
            Err(CompileErrorKind::Unsupported { .. })
        ));
    }

    #[test]
    fn operators_keep_their_shape() {
        assert!(matches!(
            lower_text("a or b").unwrap(),
            Expr::Binary {
                op: BinaryOperator::Or,
                ..
            }
        ));
    }
}
