//! Built-in function implementations

use super::engine::{Interpreter, Scope, singleton, singleton_string, to_boolean};
use super::error::{EvaluationError, EvaluationResult};
use super::operators::distinct;
use crate::compiler::{Expr, Function};
use crate::model::{Collection, PrimitiveValue, ResourceNode, Value, display_collection};

impl<'c, 'a> Interpreter<'c, 'a> {
    pub(super) fn call_function(
        &self,
        function: Function,
        input: Collection<'a>,
        args: &[Expr],
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        let name = function.name();
        let value = match function {
            Function::Exists => match args.first() {
                None => Value::Boolean(!input.is_empty()),
                Some(criteria) => Value::Boolean(!self.filter(&input, criteria, name)?.is_empty()),
            },

            Function::Empty => Value::Boolean(input.is_empty()),

            Function::All => {
                for item in &input {
                    let result = self.eval_per_item(&args[0], item)?;
                    if to_boolean(&result, name)? != Some(true) {
                        return Ok(vec![Value::Boolean(false)]);
                    }
                }
                Value::Boolean(true)
            }

            Function::Not => match to_boolean(&input, name)? {
                Some(b) => Value::Boolean(!b),
                None => return Ok(Vec::new()),
            },

            Function::Count => Value::Integer(input.len() as i64),

            Function::HasValue => Value::Boolean(
                input.len() == 1 && input.iter().all(|item| item.as_primitive().is_some()),
            ),

            Function::StartsWith | Function::EndsWith | Function::Contains => {
                let Some(text) = singleton_string(&input, name)? else {
                    return Ok(Vec::new());
                };
                let argument = self.eval(&args[0], scope)?;
                let Some(needle) = singleton_string(&argument, name)? else {
                    return Ok(Vec::new());
                };
                Value::Boolean(match function {
                    Function::StartsWith => text.starts_with(&*needle),
                    Function::EndsWith => text.ends_with(&*needle),
                    _ => text.contains(&*needle),
                })
            }

            Function::Length | Function::Lower | Function::Upper => {
                let Some(text) = singleton_string(&input, name)? else {
                    return Ok(Vec::new());
                };
                match function {
                    Function::Length => Value::Integer(text.chars().count() as i64),
                    Function::Lower => Value::string(text.to_lowercase()),
                    _ => Value::string(text.to_uppercase()),
                }
            }

            Function::Where => return self.filter(&input, &args[0], name),

            Function::Select => {
                let mut result = Vec::new();
                for item in &input {
                    result.extend(self.eval_per_item(&args[0], item)?);
                }
                return Ok(result);
            }

            Function::First => return Ok(input.into_iter().take(1).collect()),
            Function::Last => return Ok(input.into_iter().last().into_iter().collect()),
            Function::Distinct => return Ok(distinct(input)),
            Function::IsDistinct => {
                let count = input.len();
                Value::Boolean(distinct(input).len() == count)
            }

            Function::AllTrue | Function::AnyTrue => {
                let mut flags = Vec::with_capacity(input.len());
                for item in &input {
                    match item.as_primitive() {
                        Some(Value::Boolean(b)) => flags.push(b),
                        _ => {
                            return Err(EvaluationError::type_mismatch(
                                name,
                                item.type_name(),
                                "Boolean",
                            ));
                        }
                    }
                }
                Value::Boolean(if function == Function::AllTrue {
                    flags.iter().all(|b| *b)
                } else {
                    flags.iter().any(|b| *b)
                })
            }

            Function::Iif => return self.iif(input, args, scope),

            Function::Children => {
                return Ok(input
                    .iter()
                    .filter_map(Value::as_node)
                    .flat_map(|node| node.children().map(Value::Node))
                    .collect());
            }

            Function::Descendants => {
                let mut result = Vec::new();
                for node in input.iter().filter_map(Value::as_node) {
                    collect_descendants(node, &mut result);
                }
                return Ok(result);
            }

            Function::Extension => {
                let argument = self.eval(&args[0], scope)?;
                let Some(url) = singleton_string(&argument, name)? else {
                    return Ok(Vec::new());
                };
                return Ok(input
                    .iter()
                    .filter_map(Value::as_node)
                    .flat_map(|node| node.child("extension"))
                    .filter(|extension| has_url(extension, &url))
                    .map(Value::Node)
                    .collect());
            }

            Function::Trace => {
                let argument = self.eval(&args[0], scope)?;
                let label = singleton_string(&argument, name)?.unwrap_or_default();
                log::debug!("trace {label}: {}", display_collection(&input));
                return Ok(input);
            }
        };
        Ok(vec![value])
    }

    /// Items whose criteria evaluate to `true`
    fn filter(
        &self,
        input: &[Value<'a>],
        criteria: &Expr,
        name: &str,
    ) -> EvaluationResult<Collection<'a>> {
        let mut result = Vec::new();
        for item in input {
            let outcome = self.eval_per_item(criteria, item)?;
            if to_boolean(&outcome, name)? == Some(true) {
                result.push(item.clone());
            }
        }
        Ok(result)
    }

    /// `iif` evaluates only the selected branch
    fn iif(
        &self,
        input: Collection<'a>,
        args: &[Expr],
        scope: &Scope<'_, 'a>,
    ) -> EvaluationResult<Collection<'a>> {
        let focus = singleton(&input, "iif")?;
        let item_scope;
        let scope = match &focus {
            Some(item) => {
                item_scope = Scope {
                    input: std::slice::from_ref(item),
                    this: item,
                };
                &item_scope
            }
            None => scope,
        };

        let condition = self.eval(&args[0], scope)?;
        if to_boolean(&condition, "iif")? == Some(true) {
            self.eval(&args[1], scope)
        } else {
            match args.get(2) {
                Some(otherwise) => self.eval(otherwise, scope),
                None => Ok(Vec::new()),
            }
        }
    }
}

fn collect_descendants<'a>(node: &'a ResourceNode, result: &mut Collection<'a>) {
    for child in node.children() {
        result.push(Value::Node(child));
        collect_descendants(child, result);
    }
}

fn has_url(extension: &ResourceNode, url: &str) -> bool {
    extension
        .child("url")
        .first()
        .and_then(ResourceNode::value)
        .is_some_and(|value| matches!(value, PrimitiveValue::String(s) if s == url))
}
