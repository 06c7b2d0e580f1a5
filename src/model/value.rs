//! Values flowing through expression evaluation
//!
//! Every expression evaluates to a collection. Items either borrow nodes of the
//! instance tree or hold primitive values; strings borrow from the tree when
//! they come from node values.

use super::node::{PrimitiveValue, ResourceNode};
use super::types::LiteralKind;
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::fmt;

/// Ordered collection of evaluation items
pub type Collection<'a> = Vec<Value<'a>>;

/// A single item of an evaluation result
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Element of the instance tree
    Node(&'a ResourceNode),
    /// Boolean value
    Boolean(bool),
    /// Integer value (64-bit signed)
    Integer(i64),
    /// Decimal value with arbitrary precision
    Decimal(Decimal),
    /// String value
    String(Cow<'a, str>),
    /// Date value (without time)
    Date(NaiveDate),
    /// DateTime value with timezone
    DateTime(DateTime<FixedOffset>),
}

impl<'a> Value<'a> {
    /// Borrow a node's primitive value as an evaluation value
    pub fn from_primitive(value: &'a PrimitiveValue) -> Self {
        match value {
            PrimitiveValue::Boolean(b) => Value::Boolean(*b),
            PrimitiveValue::Integer(i) => Value::Integer(*i),
            PrimitiveValue::Decimal(d) => Value::Decimal(*d),
            PrimitiveValue::String(s) => Value::String(Cow::Borrowed(s)),
            PrimitiveValue::Date(d) => Value::Date(*d),
            PrimitiveValue::DateTime(dt) => Value::DateTime(*dt),
        }
    }

    /// Create an owned string value
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(Cow::Owned(value.into()))
    }

    /// Primitive view of this item: nodes yield their value, primitives themselves
    pub fn as_primitive(&self) -> Option<Value<'a>> {
        match self {
            Value::Node(node) => (*node).value().map(Value::from_primitive),
            other => Some(other.clone()),
        }
    }

    /// Kind of the primitive view, if any
    pub fn literal_kind(&self) -> Option<LiteralKind> {
        match self {
            Value::Node(node) => node.value().map(PrimitiveValue::kind),
            Value::Boolean(_) => Some(LiteralKind::Boolean),
            Value::Integer(_) => Some(LiteralKind::Integer),
            Value::Decimal(_) => Some(LiteralKind::Decimal),
            Value::String(_) => Some(LiteralKind::String),
            Value::Date(_) => Some(LiteralKind::Date),
            Value::DateTime(_) => Some(LiteralKind::DateTime),
        }
    }

    /// Node behind this item, if it is one
    pub fn as_node(&self) -> Option<&'a ResourceNode> {
        match self {
            Value::Node(node) => Some(*node),
            _ => None,
        }
    }

    /// String content of the primitive view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            Value::Node(node) => match node.value() {
                Some(PrimitiveValue::String(s)) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> Cow<'a, str> {
        match self {
            Value::Node(node) => Cow::Borrowed((*node).type_name()),
            other => match other.literal_kind() {
                Some(kind) => Cow::Borrowed(kind.name()),
                None => Cow::Borrowed("unknown"),
            },
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(node) => match node.value() {
                Some(value) => write!(f, "{}({value})", node.type_name()),
                None => write!(f, "{}@{}", node.type_name(), node.path()),
            },
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "'{s}'"),
            Value::Date(d) => write!(f, "@{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "@{}", dt.to_rfc3339()),
        }
    }
}

/// Render a collection for diagnostics: `[a, b]`
pub fn display_collection(collection: &[Value<'_>]) -> String {
    let items: Vec<String> = collection.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_view_of_nodes() {
        let node = ResourceNode::primitive("code", "female");
        let value = Value::Node(&node);
        assert_eq!(value.as_str(), Some("female"));
        assert_eq!(value.literal_kind(), Some(LiteralKind::String));
        assert_eq!(value.type_name(), "code");

        let empty = ResourceNode::new("HumanName");
        assert!(Value::Node(&empty).as_primitive().is_none());
        assert_eq!(Value::Node(&empty).literal_kind(), None);
    }

    #[test]
    fn display_for_diagnostics() {
        let items = vec![Value::Integer(1), Value::string("a"), Value::Boolean(false)];
        assert_eq!(display_collection(&items), "[1, 'a', false]");
    }
}
