//! Tree-walking interpreter for compiled expressions

use super::context::EvaluationContext;
use super::error::{EvaluationError, EvaluationResult};
use crate::compiler::{
    CompiledExpression, ContextVariable, Expr, Pattern, TypeSpecifier, TypeTestMode,
};
use crate::compiler::pattern::cached_pattern;
use crate::model::{Collection, PrimitiveValue, Value};
use std::borrow::Cow;
use std::slice;

/// Evaluate a compiled expression in a context
pub fn evaluate<'a>(
    expression: &CompiledExpression,
    context: &EvaluationContext<'a>,
) -> EvaluationResult<Collection<'a>> {
    let focus = Value::Node(context.node());
    let scope = Scope {
        input: slice::from_ref(&focus),
        this: &focus,
    };
    Interpreter { context }.eval(expression.expr(), &scope)
}

/// Evaluate a compiled expression and read the result as a boolean
///
/// Empty results are `None`; a single non-boolean item counts as `true`; more
/// than one item is a fault.
pub fn evaluate_boolean(
    expression: &CompiledExpression,
    context: &EvaluationContext<'_>,
) -> EvaluationResult<Option<bool>> {
    let result = evaluate(expression, context)?;
    to_boolean(&result, "invariant result")
}

/// Focus of the expression currently being evaluated
pub(super) struct Scope<'s, 'a> {
    /// Implicit input of receiver-less navigation and function calls
    pub input: &'s [Value<'a>],
    /// `$this`
    pub this: &'s Value<'a>,
}

pub(super) struct Interpreter<'c, 'a> {
    pub context: &'c EvaluationContext<'a>,
}

impl<'c, 'a> Interpreter<'c, 'a> {
    pub(super) fn eval(&self, expr: &Expr, scope: &Scope<'_, 'a>) -> EvaluationResult<Collection<'a>> {
        match expr {
            Expr::Literal(value) => Ok(vec![literal_value(value)]),
            Expr::Empty => Ok(Vec::new()),
            Expr::Variable(variable) => Ok(self.variable(variable, scope)),

            Expr::Member { base: None, name } => navigate_implicit(scope.input, name),
            Expr::Member {
                base: Some(base),
                name,
            } => {
                let base = self.eval(base, scope)?;
                navigate(&base, name)
            }

            Expr::Index { base, index } => {
                let base = self.eval(base, scope)?;
                let index = self.eval(index, scope)?;
                self.index(base, &index)
            }

            Expr::Call {
                base,
                function,
                args,
            } => {
                let input = self.receiver(base.as_deref(), scope)?;
                self.call_function(*function, input, args, scope)
            }

            Expr::Matches { base, pattern } => {
                let input = self.receiver(base.as_deref(), scope)?;
                self.matches(&input, pattern, scope)
            }

            Expr::TypeTest { base, target, mode } => {
                let input = self.receiver(base.as_deref(), scope)?;
                type_test(input, target, *mode)
            }

            Expr::Binary { op, left, right } => self.binary(*op, left, right, scope),

            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, scope)?;
                super::operators::unary(*op, &operand)
            }
        }
    }

    /// Explicit receiver, or the implicit input of the scope
    pub(super) fn receiver(
        &self,
        base: Option<&Expr>,
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        match base {
            Some(base) => self.eval(base, scope),
            None => Ok(scope.input.to_vec()),
        }
    }

    /// Evaluate `criteria` once per item, with the item as `$this` and input
    pub(super) fn eval_per_item(
        &self,
        criteria: &Expr,
        item: &Value<'a>,
    ) -> EvaluationResult<Collection<'a>> {
        let scope = Scope {
            input: slice::from_ref(item),
            this: item,
        };
        self.eval(criteria, &scope)
    }

    fn variable(&self, variable: &ContextVariable, scope: &Scope<'_, 'a>) -> Collection<'a> {
        match variable {
            ContextVariable::This => vec![scope.this.clone()],
            ContextVariable::Context => vec![Value::Node(self.context.node())],
            ContextVariable::Resource => vec![Value::Node(self.context.root())],
            ContextVariable::Parent => self.context.parent().map(Value::Node).into_iter().collect(),
            constant => constant.constant_value().map(Value::string).into_iter().collect(),
        }
    }

    fn index(&self, base: Collection<'a>, index: &[Value<'a>]) -> EvaluationResult<Collection<'a>> {
        let position = match singleton(index, "indexer")? {
            None => return Ok(Vec::new()),
            Some(value) => match value.as_primitive() {
                Some(Value::Integer(i)) => i,
                _ => {
                    return Err(EvaluationError::type_mismatch(
                        "[]",
                        "collection",
                        value.type_name(),
                    ));
                }
            },
        };
        Ok(usize::try_from(position)
            .ok()
            .and_then(|position| base.into_iter().nth(position))
            .into_iter()
            .collect())
    }

    fn matches(
        &self,
        input: &[Value<'a>],
        pattern: &Pattern,
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        let Some(text) = singleton_string(input, "matches")? else {
            return Ok(Vec::new());
        };
        let regex = match pattern {
            Pattern::Compiled(regex) => regex.clone(),
            Pattern::Dynamic(expr) => {
                let pattern = self.eval(expr, scope)?;
                let Some(pattern) = singleton_string(&pattern, "matches")? else {
                    return Ok(Vec::new());
                };
                cached_pattern(&pattern).map_err(|e| EvaluationError::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?
            }
        };
        Ok(vec![Value::Boolean(regex.is_match(&text))])
    }
}

fn literal_value<'a>(value: &PrimitiveValue) -> Value<'a> {
    match value {
        PrimitiveValue::String(s) => Value::String(Cow::Owned(s.clone())),
        PrimitiveValue::Boolean(b) => Value::Boolean(*b),
        PrimitiveValue::Integer(i) => Value::Integer(*i),
        PrimitiveValue::Decimal(d) => Value::Decimal(*d),
        PrimitiveValue::Date(d) => Value::Date(*d),
        PrimitiveValue::DateTime(dt) => Value::DateTime(*dt),
    }
}

/// Navigation from the implicit input
///
/// A name equal to the declared type of a focus node that has no such element
/// selects the node itself, so `Patient.name` works in a Patient context.
fn navigate_implicit<'a>(input: &[Value<'a>], name: &str) -> EvaluationResult<Collection<'a>> {
    let mut result = Vec::new();
    for item in input {
        match item {
            Value::Node(node) if node.type_name() == name && !node.has_element(name) => {
                result.push(item.clone());
            }
            _ => result.extend(navigate(slice::from_ref(item), name)?),
        }
    }
    Ok(result)
}

/// Child elements named `name` of every node in `input`
pub(super) fn navigate<'a>(input: &[Value<'a>], name: &str) -> EvaluationResult<Collection<'a>> {
    let mut result = Vec::new();
    for item in input {
        match item {
            Value::Node(node) => {
                let children = node.child(name);
                if !children.is_empty() {
                    result.extend(children.iter().map(Value::Node));
                } else if name == "value" {
                    if let Some(value) = node.value() {
                        result.push(Value::from_primitive(value));
                    }
                }
            }
            primitive => {
                return Err(EvaluationError::InvalidNavigation {
                    member: name.to_string(),
                    type_name: primitive.type_name().into_owned(),
                });
            }
        }
    }
    Ok(result)
}

fn type_test<'a>(
    input: Collection<'a>,
    target: &TypeSpecifier,
    mode: TypeTestMode,
) -> EvaluationResult<Collection<'a>> {
    match mode {
        TypeTestMode::OfType => Ok(input
            .into_iter()
            .filter(|item| type_matches(item, target))
            .collect()),
        TypeTestMode::Is => Ok(singleton(&input, "is")?
            .map(|item| Value::Boolean(type_matches(&item, target)))
            .into_iter()
            .collect()),
        TypeTestMode::As => Ok(singleton(&input, "as")?
            .filter(|item| type_matches(item, target))
            .into_iter()
            .collect()),
    }
}

/// Whether an item is of the given type
///
/// System kinds also accept nodes whose primitive value has that kind, so
/// `value is String` holds for a FHIR `code` node.
pub(super) fn type_matches(item: &Value<'_>, target: &TypeSpecifier) -> bool {
    match (item, target) {
        (Value::Node(node), TypeSpecifier::Named(name)) => node.type_name() == name,
        (item, TypeSpecifier::System(kind)) => item.literal_kind() == Some(*kind),
        (item, TypeSpecifier::Named(name)) => item
            .literal_kind()
            .is_some_and(|kind| kind.name().eq_ignore_ascii_case(name)),
    }
}

/// At most one item, or a fault naming the position
pub(super) fn singleton<'a>(
    collection: &[Value<'a>],
    context: &str,
) -> EvaluationResult<Option<Value<'a>>> {
    match collection {
        [] => Ok(None),
        [item] => Ok(Some(item.clone())),
        _ => Err(EvaluationError::NotSingleton {
            context: context.to_string(),
            count: collection.len(),
        }),
    }
}

/// Singleton string content; non-strings are a type mismatch
pub(super) fn singleton_string<'a>(
    collection: &[Value<'a>],
    context: &str,
) -> EvaluationResult<Option<Cow<'a, str>>> {
    let Some(item) = singleton(collection, context)? else {
        return Ok(None);
    };
    match item.as_primitive() {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Err(EvaluationError::type_mismatch(
            context,
            item.type_name(),
            "String",
        )),
    }
}

/// Singleton evaluation of a collection in a boolean position
pub(super) fn to_boolean(collection: &[Value<'_>], context: &str) -> EvaluationResult<Option<bool>> {
    match singleton(collection, context)? {
        None => Ok(None),
        Some(item) => match item.as_primitive() {
            Some(Value::Boolean(b)) => Ok(Some(b)),
            _ => Ok(Some(true)),
        },
    }
}
