//! Closed set of primitive kinds shared by literals, node values and type tests

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a primitive value
///
/// Produced once when a literal or type specifier is compiled, and when a node
/// carries a primitive value. Type predicates match on this tag exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    /// System.Boolean
    Boolean,
    /// System.Integer
    Integer,
    /// System.Decimal
    Decimal,
    /// System.String
    String,
    /// System.Date
    Date,
    /// System.DateTime
    DateTime,
}

impl LiteralKind {
    /// All kinds, in declaration order
    pub const ALL: [LiteralKind; 6] = [
        LiteralKind::Boolean,
        LiteralKind::Integer,
        LiteralKind::Decimal,
        LiteralKind::String,
        LiteralKind::Date,
        LiteralKind::DateTime,
    ];

    /// Unqualified system type name
    pub fn name(self) -> &'static str {
        match self {
            LiteralKind::Boolean => "Boolean",
            LiteralKind::Integer => "Integer",
            LiteralKind::Decimal => "Decimal",
            LiteralKind::String => "String",
            LiteralKind::Date => "Date",
            LiteralKind::DateTime => "DateTime",
        }
    }

    /// Resolve a system type name (`Decimal`, `System.Decimal`)
    pub fn from_system_name(name: &str) -> Option<Self> {
        let unqualified = name.strip_prefix("System.").unwrap_or(name);
        Self::ALL.into_iter().find(|kind| kind.name() == unqualified)
    }
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System.{}", self.name())
    }
}
