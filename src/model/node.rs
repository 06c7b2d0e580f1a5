//! In-memory instance tree validated by the engine
//!
//! A [`ResourceNode`] owns its children; nothing in the tree points back to a
//! parent. Ancestor access during validation comes from the traversal stack.

use super::types::LiteralKind;
use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;

/// Primitive value carried by a node
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// boolean
    Boolean(bool),
    /// integer, positiveInt, unsignedInt
    Integer(i64),
    /// decimal, kept exact
    Decimal(Decimal),
    /// string, code, uri, id, markdown and friends
    String(String),
    /// date
    Date(NaiveDate),
    /// dateTime, instant
    DateTime(DateTime<FixedOffset>),
}

impl PrimitiveValue {
    /// Kind tag of this value
    pub fn kind(&self) -> LiteralKind {
        match self {
            PrimitiveValue::Boolean(_) => LiteralKind::Boolean,
            PrimitiveValue::Integer(_) => LiteralKind::Integer,
            PrimitiveValue::Decimal(_) => LiteralKind::Decimal,
            PrimitiveValue::String(_) => LiteralKind::String,
            PrimitiveValue::Date(_) => LiteralKind::Date,
            PrimitiveValue::DateTime(_) => LiteralKind::DateTime,
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Boolean(b) => write!(f, "{b}"),
            PrimitiveValue::Integer(i) => write!(f, "{i}"),
            PrimitiveValue::Decimal(d) => write!(f, "{d}"),
            PrimitiveValue::String(s) => f.write_str(s),
            PrimitiveValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PrimitiveValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        PrimitiveValue::Boolean(value)
    }
}

impl From<i64> for PrimitiveValue {
    fn from(value: i64) -> Self {
        PrimitiveValue::Integer(value)
    }
}

impl From<i32> for PrimitiveValue {
    fn from(value: i32) -> Self {
        PrimitiveValue::Integer(value.into())
    }
}

impl From<Decimal> for PrimitiveValue {
    fn from(value: Decimal) -> Self {
        PrimitiveValue::Decimal(value)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::String(value.to_string())
    }
}

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::String(value)
    }
}

impl From<NaiveDate> for PrimitiveValue {
    fn from(value: NaiveDate) -> Self {
        PrimitiveValue::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for PrimitiveValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        PrimitiveValue::DateTime(value)
    }
}

/// Occurrences of one child element name
#[derive(Debug, Clone, PartialEq, Default)]
struct ChildElements {
    /// Declared as a repeating element; indexed in paths even with one occurrence
    repeating: bool,
    nodes: Vec<ResourceNode>,
}

impl ChildElements {
    fn is_indexed(&self) -> bool {
        self.repeating || self.nodes.len() > 1
    }
}

/// One element of an instance tree
///
/// The path is computed from the root and rebased whenever a subtree is
/// attached, so a node built bottom-up still reports `Patient.contact[0].name`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    type_name: String,
    value: Option<PrimitiveValue>,
    children: IndexMap<String, ChildElements>,
    path: String,
}

impl ResourceNode {
    /// Create a root node; its path is its type name
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            path: type_name.clone(),
            type_name,
            value: None,
            children: IndexMap::new(),
        }
    }

    /// Create a primitive node of the given FHIR type carrying a value
    pub fn primitive(type_name: impl Into<String>, value: impl Into<PrimitiveValue>) -> Self {
        Self::new(type_name).with_value(value)
    }

    /// Set the primitive value
    pub fn with_value(mut self, value: impl Into<PrimitiveValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Append one occurrence of a child element
    pub fn with_child(mut self, name: impl Into<String>, child: ResourceNode) -> Self {
        self.add_child(name, child);
        self
    }

    /// Append occurrences of a repeating child element
    ///
    /// The element is marked repeating even when a single node is supplied, so
    /// its path carries an index (`telecom[0]`).
    pub fn with_children(
        mut self,
        name: impl Into<String>,
        children: impl IntoIterator<Item = ResourceNode>,
    ) -> Self {
        let name = name.into();
        self.children.entry(name.clone()).or_default().repeating = true;
        for child in children {
            self.add_child(name.clone(), child);
        }
        self
    }

    /// Append one occurrence of a child element in place
    pub fn add_child(&mut self, name: impl Into<String>, child: ResourceNode) {
        let name = name.into();
        let elements = self.children.entry(name.clone()).or_default();
        elements.nodes.push(child);
        Self::rebase_elements(&self.path, &name, elements);
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Primitive value, if any
    pub fn value(&self) -> Option<&PrimitiveValue> {
        self.value.as_ref()
    }

    /// Path from the root, e.g. `Patient.contact[0].name`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Occurrences of a child element in document order; empty when absent
    pub fn child(&self, name: &str) -> &[ResourceNode] {
        self.children
            .get(name)
            .map(|elements| elements.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Whether an element with this name has been declared on the node
    pub fn has_element(&self, name: &str) -> bool {
        self.children
            .get(name)
            .is_some_and(|elements| !elements.nodes.is_empty())
    }

    /// All children flattened in document order
    pub fn children(&self) -> impl Iterator<Item = &ResourceNode> {
        self.children
            .values()
            .flat_map(|elements| elements.nodes.iter())
    }

    /// Compare type, value and children while ignoring where the nodes sit in their trees
    pub fn same_content(&self, other: &ResourceNode) -> bool {
        self.type_name == other.type_name
            && self.value == other.value
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|((name_a, a), (name_b, b))| {
                    name_a == name_b
                        && a.nodes.len() == b.nodes.len()
                        && a.nodes
                            .iter()
                            .zip(b.nodes.iter())
                            .all(|(x, y)| x.same_content(y))
                })
    }

    fn rebase(&mut self, path: String) {
        self.path = path;
        let base = self.path.clone();
        for (name, elements) in self.children.iter_mut() {
            Self::rebase_elements(&base, name, elements);
        }
    }

    fn rebase_elements(base: &str, name: &str, elements: &mut ChildElements) {
        let indexed = elements.is_indexed();
        for (index, node) in elements.nodes.iter_mut().enumerate() {
            let path = if indexed {
                format!("{base}.{name}[{index}]")
            } else {
                format!("{base}.{name}")
            };
            node.rebase(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rebased_when_subtrees_attach() {
        let contact = ResourceNode::new("BackboneElement").with_child(
            "name",
            ResourceNode::new("HumanName").with_child("family", ResourceNode::primitive("string", "Doe")),
        );
        let patient = ResourceNode::new("Patient").with_children("contact", vec![contact]);

        let contact = &patient.child("contact")[0];
        assert_eq!(contact.path(), "Patient.contact[0]");
        assert_eq!(contact.child("name")[0].path(), "Patient.contact[0].name");
        assert_eq!(
            contact.child("name")[0].child("family")[0].path(),
            "Patient.contact[0].name.family"
        );
    }

    #[test]
    fn second_occurrence_switches_to_indexed_paths() {
        let mut patient = ResourceNode::new("Patient");
        patient.add_child("name", ResourceNode::new("HumanName"));
        assert_eq!(patient.child("name")[0].path(), "Patient.name");

        patient.add_child("name", ResourceNode::new("HumanName"));
        let paths: Vec<_> = patient.child("name").iter().map(|n| n.path()).collect();
        assert_eq!(paths, vec!["Patient.name[0]", "Patient.name[1]"]);
    }

    #[test]
    fn children_iterate_in_document_order() {
        let node = ResourceNode::new("Patient")
            .with_child("active", ResourceNode::primitive("boolean", true))
            .with_children(
                "name",
                vec![ResourceNode::new("HumanName"), ResourceNode::new("HumanName")],
            )
            .with_child("gender", ResourceNode::primitive("code", "female"));

        let order: Vec<_> = node.children().map(|n| n.path().to_string()).collect();
        assert_eq!(
            order,
            vec![
                "Patient.active",
                "Patient.name[0]",
                "Patient.name[1]",
                "Patient.gender"
            ]
        );
        assert!(node.child("missing").is_empty());
    }

    #[test]
    fn same_content_ignores_position() {
        let a = ResourceNode::primitive("string", "x");
        let b = ResourceNode::new("Patient").with_child("id", ResourceNode::primitive("string", "x"));
        assert!(a.same_content(&b.child("id")[0]));
        assert_ne!(a, b.child("id")[0]);
    }
}
