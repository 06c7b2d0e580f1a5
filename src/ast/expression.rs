//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use smallvec::SmallVec;

/// AST representation of invariant expressions
///
/// Large variants are boxed to keep the enum small; the tree is built once per
/// expression and immediately lowered by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionNode {
    /// Literal value (string, number, boolean, etc.)
    Literal(LiteralValue),

    /// Identifier (element name or type name)
    Identifier(String),

    /// Path navigation (object.property)
    Path {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Property path
        path: String,
    },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation (negation, positive sign)
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Function call without an explicit receiver (`exists()`)
    FunctionCall(Box<FunctionCallData>),

    /// Method call on an expression (`name.exists()`)
    MethodCall(Box<MethodCallData>),

    /// Index access (collection\[index\])
    Index {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Type check (value is Type)
    TypeCheck {
        /// Expression to check
        expression: Box<ExpressionNode>,
        /// Type name, possibly qualified (`System.String`)
        type_name: String,
    },

    /// Type cast (value as Type)
    TypeCast {
        /// Expression to cast
        expression: Box<ExpressionNode>,
        /// Type name, possibly qualified
        type_name: String,
    },

    /// Variable or environment constant reference (`$this`, `%resource`)
    Variable(String),
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Function call data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Function arguments
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Method call data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodCallData {
    /// Base expression to call method on
    pub base: ExpressionNode,
    /// Method name
    pub method: String,
    /// Method arguments
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Literal values as written in the expression source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal (stored as string to preserve precision)
    Decimal(String),
    /// String literal with escapes already processed
    String(String),
    /// Date literal (YYYY-MM-DD)
    Date(String),
    /// DateTime literal (ISO 8601)
    DateTime(String),
    /// Empty collection literal (`{}`)
    Null,
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create an identifier expression
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Create a function call expression
    pub fn function_call(
        name: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a method call expression
    pub fn method_call(
        base: ExpressionNode,
        method: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::MethodCall(Box::new(MethodCallData {
            base,
            method: method.into(),
            args: args.into(),
        }))
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a path navigation expression
    pub fn path(base: ExpressionNode, path: impl Into<String>) -> Self {
        Self::Path {
            base: Box::new(base),
            path: path.into(),
        }
    }

    /// Create an index access expression
    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a type check expression
    pub fn type_check(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        Self::TypeCheck {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    /// Create a type cast expression
    pub fn type_cast(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        Self::TypeCast {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    /// Create a variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Render a type specifier argument (`is(System.String)`) back into its dotted name
    pub fn as_qualified_name(&self) -> Option<String> {
        match self {
            Self::Identifier(name) => Some(name.clone()),
            Self::Path { base, path } => base
                .as_qualified_name()
                .map(|prefix| format!("{prefix}.{path}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_from_path() {
        let node = ExpressionNode::path(ExpressionNode::identifier("System"), "String");
        assert_eq!(node.as_qualified_name().as_deref(), Some("System.String"));

        let call = ExpressionNode::function_call("exists", vec![]);
        assert_eq!(call.as_qualified_name(), None);
    }
}
