//! Operator semantics: three-valued logic, equality, ordering and arithmetic

use super::engine::{Interpreter, Scope, singleton, to_boolean};
use super::error::{EvaluationError, EvaluationResult};
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::compiler::Expr;
use crate::model::{Collection, Value};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

impl<'c, 'a> Interpreter<'c, 'a> {
    pub(super) fn binary(
        &self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        if op.is_logical() {
            return self.logical(op, left, right, scope);
        }

        let left = self.eval(left, scope)?;
        let right = self.eval(right, scope)?;

        match op {
            BinaryOperator::Equal => Ok(boolean_result(equals(&left, &right))),
            BinaryOperator::NotEqual => Ok(boolean_result(equals(&left, &right).map(|b| !b))),
            BinaryOperator::Equivalent => Ok(vec![Value::Boolean(equivalent(&left, &right))]),
            BinaryOperator::NotEquivalent => Ok(vec![Value::Boolean(!equivalent(&left, &right))]),
            BinaryOperator::Union => Ok(distinct(left.into_iter().chain(right))),
            BinaryOperator::In => membership(&left, &right, "in"),
            BinaryOperator::Contains => membership(&right, &left, "contains"),
            BinaryOperator::Concatenate => concatenate(&left, &right),
            op if op.is_relational() => relational(op, &left, &right),
            op => arithmetic(op, &left, &right),
        }
    }

    /// `and`, `or`, `xor`, `implies`; the right side is skipped when the left decides
    fn logical(
        &self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        let context = op.symbol();
        let lhs = to_boolean(&self.eval(left, scope)?, context)?;

        let short_circuit = match (op, lhs) {
            (BinaryOperator::And, Some(false)) => Some(false),
            (BinaryOperator::Or, Some(true)) => Some(true),
            (BinaryOperator::Implies, Some(false)) => Some(true),
            _ => None,
        };
        if let Some(result) = short_circuit {
            return Ok(vec![Value::Boolean(result)]);
        }

        let rhs = to_boolean(&self.eval(right, scope)?, context)?;
        let result = match op {
            BinaryOperator::And => match (lhs, rhs) {
                (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            BinaryOperator::Or => match (lhs, rhs) {
                (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            BinaryOperator::Xor => match (lhs, rhs) {
                (Some(l), Some(r)) => Some(l != r),
                _ => None,
            },
            BinaryOperator::Implies => match (lhs, rhs) {
                (_, Some(true)) => Some(true),
                (Some(true), r) => r,
                _ => None,
            },
            other => {
                return Err(EvaluationError::invalid_operation(format!(
                    "'{other}' is not a logical operator"
                )));
            }
        };
        Ok(boolean_result(result))
    }
}

pub(super) fn unary<'a>(op: UnaryOperator, operand: &[Value<'a>]) -> EvaluationResult<Collection<'a>> {
    let Some(item) = singleton(operand, op.symbol())? else {
        return Ok(Vec::new());
    };
    let value = match (op, item.as_primitive()) {
        (UnaryOperator::Positive, Some(value @ (Value::Integer(_) | Value::Decimal(_)))) => value,
        (UnaryOperator::Negate, Some(Value::Integer(i))) => {
            Value::Integer(i.checked_neg().ok_or_else(|| overflow(op.symbol()))?)
        }
        (UnaryOperator::Negate, Some(Value::Decimal(d))) => Value::Decimal(-d),
        _ => {
            return Err(EvaluationError::type_mismatch(
                op.symbol(),
                item.type_name(),
                "number",
            ));
        }
    };
    Ok(vec![value])
}

fn boolean_result<'a>(value: Option<bool>) -> Collection<'a> {
    value.map(Value::Boolean).into_iter().collect()
}

/// `=` over collections: empty when either side is empty
pub(super) fn equals(left: &[Value<'_>], right: &[Value<'_>]) -> Option<bool> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    if left.len() != right.len() {
        return Some(false);
    }
    let mut result = Some(true);
    for (a, b) in left.iter().zip(right) {
        match item_equals(a, b) {
            Some(false) => return Some(false),
            None => result = None,
            Some(true) => {}
        }
    }
    result
}

/// Equality of two items; `None` when precision makes it indeterminate
pub(super) fn item_equals(a: &Value<'_>, b: &Value<'_>) -> Option<bool> {
    if let (Value::Node(x), Value::Node(y)) = (a, b) {
        if x.value().is_none() || y.value().is_none() {
            return Some(x.same_content(y));
        }
    }
    match (a.as_primitive(), b.as_primitive()) {
        (Some(x), Some(y)) => match compare_primitives(&x, &y) {
            Comparison::Ordered(ordering) => Some(ordering == Ordering::Equal),
            Comparison::Indeterminate => None,
            Comparison::Incomparable => Some(false),
        },
        _ => Some(false),
    }
}

/// `~` over collections: order-insensitive, two empties are equivalent
fn equivalent(left: &[Value<'_>], right: &[Value<'_>]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|a| right.iter().any(|b| item_equivalent(a, b)))
}

fn item_equivalent(a: &Value<'_>, b: &Value<'_>) -> bool {
    match (a.as_primitive(), b.as_primitive()) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            normalize_whitespace(&x).to_lowercase() == normalize_whitespace(&y).to_lowercase()
        }
        _ => item_equals(a, b).unwrap_or(false),
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first of every group of equal items
pub(super) fn distinct<'a>(items: impl IntoIterator<Item = Value<'a>>) -> Collection<'a> {
    let mut result: Collection<'a> = Vec::new();
    for item in items {
        if !result.iter().any(|kept| item_equals(kept, &item) == Some(true)) {
            result.push(item);
        }
    }
    result
}

fn membership<'a>(
    needle: &[Value<'a>],
    haystack: &[Value<'a>],
    operation: &str,
) -> EvaluationResult<Collection<'a>> {
    let Some(item) = singleton(needle, operation)? else {
        return Ok(Vec::new());
    };
    let found = haystack
        .iter()
        .any(|candidate| item_equals(&item, candidate) == Some(true));
    Ok(vec![Value::Boolean(found)])
}

fn concatenate<'a>(left: &[Value<'a>], right: &[Value<'a>]) -> EvaluationResult<Collection<'a>> {
    let mut text = String::new();
    for side in [left, right] {
        if let Some(s) = super::engine::singleton_string(side, "&")? {
            text.push_str(&s);
        }
    }
    Ok(vec![Value::string(text)])
}

/// Outcome of comparing two primitive values
enum Comparison {
    Ordered(Ordering),
    /// Same family, different precision (a date against a date-time on the same day)
    Indeterminate,
    Incomparable,
}

fn compare_primitives(a: &Value<'_>, b: &Value<'_>) -> Comparison {
    use Comparison::*;
    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => Ordered(x.cmp(y)),
        (Value::Integer(x), Value::Integer(y)) => Ordered(x.cmp(y)),
        (Value::Decimal(x), Value::Decimal(y)) => Ordered(x.cmp(y)),
        (Value::Integer(x), Value::Decimal(y)) => Ordered(Decimal::from(*x).cmp(y)),
        (Value::Decimal(x), Value::Integer(y)) => Ordered(x.cmp(&Decimal::from(*y))),
        (Value::String(x), Value::String(y)) => Ordered(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Ordered(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Ordered(x.cmp(y)),
        (Value::Date(x), Value::DateTime(y)) => match x.cmp(&y.date_naive()) {
            Ordering::Equal => Indeterminate,
            ordering => Ordered(ordering),
        },
        (Value::DateTime(x), Value::Date(y)) => match x.date_naive().cmp(y) {
            Ordering::Equal => Indeterminate,
            ordering => Ordered(ordering),
        },
        _ => Incomparable,
    }
}

fn relational<'a>(
    op: BinaryOperator,
    left: &[Value<'a>],
    right: &[Value<'a>],
) -> EvaluationResult<Collection<'a>> {
    let (Some(a), Some(b)) = (singleton(left, op.symbol())?, singleton(right, op.symbol())?) else {
        return Ok(Vec::new());
    };
    let (Some(x), Some(y)) = (a.as_primitive(), b.as_primitive()) else {
        return Err(EvaluationError::type_mismatch(op.symbol(), a.type_name(), b.type_name()));
    };
    let ordering = match compare_primitives(&x, &y) {
        Comparison::Ordered(ordering) => ordering,
        Comparison::Indeterminate => return Ok(Vec::new()),
        Comparison::Incomparable => {
            return Err(EvaluationError::type_mismatch(op.symbol(), a.type_name(), b.type_name()));
        }
    };
    let result = match op {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(vec![Value::Boolean(result)])
}

fn overflow(operation: &str) -> EvaluationError {
    EvaluationError::ArithmeticOverflow {
        operation: operation.to_string(),
    }
}

fn arithmetic<'a>(
    op: BinaryOperator,
    left: &[Value<'a>],
    right: &[Value<'a>],
) -> EvaluationResult<Collection<'a>> {
    let symbol = op.symbol();
    let (Some(a), Some(b)) = (singleton(left, symbol)?, singleton(right, symbol)?) else {
        return Ok(Vec::new());
    };
    let mismatch = || EvaluationError::type_mismatch(symbol, a.type_name(), b.type_name());
    let (Some(x), Some(y)) = (a.as_primitive(), b.as_primitive()) else {
        return Err(mismatch());
    };

    let value = match (op, x, y) {
        (BinaryOperator::Add, Value::String(s), Value::String(t)) => Value::string(format!("{s}{t}")),

        (op, Value::Integer(i), Value::Integer(j)) => match op {
            BinaryOperator::Add => Value::Integer(i.checked_add(j).ok_or_else(|| overflow(symbol))?),
            BinaryOperator::Subtract => {
                Value::Integer(i.checked_sub(j).ok_or_else(|| overflow(symbol))?)
            }
            BinaryOperator::Multiply => {
                Value::Integer(i.checked_mul(j).ok_or_else(|| overflow(symbol))?)
            }
            BinaryOperator::IntegerDivide | BinaryOperator::Modulo if j == 0 => return Ok(Vec::new()),
            BinaryOperator::IntegerDivide => {
                Value::Integer(i.checked_div(j).ok_or_else(|| overflow(symbol))?)
            }
            BinaryOperator::Modulo => Value::Integer(i.checked_rem(j).ok_or_else(|| overflow(symbol))?),
            _ => return decimal_arithmetic(op, Decimal::from(i), Decimal::from(j)),
        },

        (op, x @ (Value::Integer(_) | Value::Decimal(_)), y @ (Value::Integer(_) | Value::Decimal(_))) => {
            return decimal_arithmetic(op, as_decimal(&x), as_decimal(&y));
        }

        _ => return Err(mismatch()),
    };
    Ok(vec![value])
}

fn as_decimal(value: &Value<'_>) -> Decimal {
    match value {
        Value::Integer(i) => Decimal::from(*i),
        Value::Decimal(d) => *d,
        _ => Decimal::ZERO,
    }
}

fn decimal_arithmetic<'a>(op: BinaryOperator, x: Decimal, y: Decimal) -> EvaluationResult<Collection<'a>> {
    let symbol = op.symbol();
    if matches!(
        op,
        BinaryOperator::Divide | BinaryOperator::IntegerDivide | BinaryOperator::Modulo
    ) && y.is_zero()
    {
        return Ok(Vec::new());
    }
    let value = match op {
        BinaryOperator::Add => x.checked_add(y).map(Value::Decimal),
        BinaryOperator::Subtract => x.checked_sub(y).map(Value::Decimal),
        BinaryOperator::Multiply => x.checked_mul(y).map(Value::Decimal),
        BinaryOperator::Divide => x.checked_div(y).map(|d| Value::Decimal(d.normalize())),
        BinaryOperator::Modulo => x.checked_rem(y).map(Value::Decimal),
        BinaryOperator::IntegerDivide => x
            .checked_div(y)
            .and_then(|d| d.trunc().to_i64())
            .map(Value::Integer),
        other => {
            return Err(EvaluationError::invalid_operation(format!(
                "'{other}' is not an arithmetic operator"
            )));
        }
    };
    value.map(|v| vec![v]).ok_or_else(|| overflow(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::evaluator::{EvaluationContext, evaluate};
    use crate::model::{ResourceNode, display_collection};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn eval(text: &str) -> EvaluationResult<String> {
        let node = ResourceNode::new("Basic");
        let compiled = compile(text).unwrap();
        evaluate(&compiled, &EvaluationContext::new(&node)).map(|c| display_collection(&c))
    }

    #[rstest]
    #[case("true and {}", "[]")]
    #[case("false and {}", "[false]")]
    #[case("{} or true", "[true]")]
    #[case("{} or false", "[]")]
    #[case("true xor false", "[true]")]
    #[case("false implies {}", "[true]")]
    #[case("true implies {}", "[]")]
    #[case("{} implies true", "[true]")]
    fn three_valued_logic(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(eval(text).unwrap(), expected, "{text}");
    }

    #[rstest]
    #[case("1 = 1.0", "[true]")]
    #[case("0.1 + 0.2 = 0.3", "[true]")]
    #[case("1.10 = 1.1", "[true]")]
    #[case("'a' = {}", "[]")]
    #[case("'a' != 'b'", "[true]")]
    #[case("'Hello  World' ~ 'hello world'", "[true]")]
    #[case("{} ~ {}", "[true]")]
    #[case("(1 | 2 | 1).count()", "[2]")]
    #[case("2 in (1 | 2)", "[true]")]
    #[case("(1 | 2) contains 3", "[false]")]
    #[case("@2020-01-01 < @2020-01-02", "[true]")]
    #[case("@2020-01-01 = @2020-01-01T10:00:00Z", "[]")]
    #[case("@2020-01-01 < @2020-01-02T10:00:00Z", "[true]")]
    fn equality_and_ordering(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(eval(text).unwrap(), expected, "{text}");
    }

    #[rstest]
    #[case("1 + 2 * 3", "[7]")]
    #[case("7 div 2", "[3]")]
    #[case("7 mod 2", "[1]")]
    #[case("1 / 4", "[0.25]")]
    #[case("1 / 0", "[]")]
    #[case("5 div 0", "[]")]
    #[case("'a' + 'b'", "['ab']")]
    #[case("'a' & {}", "['a']")]
    #[case("-(2 - 5)", "[3]")]
    fn arithmetic_results(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(eval(text).unwrap(), expected, "{text}");
    }

    #[test]
    fn faults() {
        assert!(matches!(
            eval("9223372036854775807 + 1"),
            Err(EvaluationError::ArithmeticOverflow { .. })
        ));
        assert!(matches!(
            eval("'a' < 1"),
            Err(EvaluationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            eval("(1 | 2) < 3"),
            Err(EvaluationError::NotSingleton { count: 2, .. })
        ));
        assert!(matches!(
            eval("(true | false) and true"),
            Err(EvaluationError::NotSingleton { .. })
        ));
    }
}
