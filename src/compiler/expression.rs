//! Compiled, evaluable form of an invariant expression

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::model::{LiteralKind, PrimitiveValue};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Built-in functions, resolved by name at compile time
///
/// `matches`, `is`, `as` and `ofType` are lowered into dedicated [`Expr`] variants
/// and do not appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `exists([criteria])`
    Exists,
    /// `empty()`
    Empty,
    /// `all(criteria)`: universal quantifier, vacuously true
    All,
    /// `not()`
    Not,
    /// `count()`
    Count,
    /// `hasValue()`
    HasValue,
    /// `startsWith(prefix)`
    StartsWith,
    /// `endsWith(suffix)`
    EndsWith,
    /// `contains(substring)`
    Contains,
    /// `length()`
    Length,
    /// `lower()`
    Lower,
    /// `upper()`
    Upper,
    /// `where(criteria)`
    Where,
    /// `select(projection)`
    Select,
    /// `first()`
    First,
    /// `last()`
    Last,
    /// `distinct()`
    Distinct,
    /// `isDistinct()`
    IsDistinct,
    /// `allTrue()`
    AllTrue,
    /// `anyTrue()`
    AnyTrue,
    /// `iif(condition, then[, else])`
    Iif,
    /// `children()`
    Children,
    /// `descendants()`
    Descendants,
    /// `extension(url)`
    Extension,
    /// `trace(label)`
    Trace,
}

impl Function {
    /// Resolve a function by its expression name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exists" => Function::Exists,
            "empty" => Function::Empty,
            "all" => Function::All,
            "not" => Function::Not,
            "count" => Function::Count,
            "hasValue" => Function::HasValue,
            "startsWith" => Function::StartsWith,
            "endsWith" => Function::EndsWith,
            "contains" => Function::Contains,
            "length" => Function::Length,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            "where" => Function::Where,
            "select" => Function::Select,
            "first" => Function::First,
            "last" => Function::Last,
            "distinct" => Function::Distinct,
            "isDistinct" => Function::IsDistinct,
            "allTrue" => Function::AllTrue,
            "anyTrue" => Function::AnyTrue,
            "iif" => Function::Iif,
            "children" => Function::Children,
            "descendants" => Function::Descendants,
            "extension" => Function::Extension,
            "trace" => Function::Trace,
            _ => return None,
        })
    }

    /// Expression name of the function
    pub fn name(self) -> &'static str {
        match self {
            Function::Exists => "exists",
            Function::Empty => "empty",
            Function::All => "all",
            Function::Not => "not",
            Function::Count => "count",
            Function::HasValue => "hasValue",
            Function::StartsWith => "startsWith",
            Function::EndsWith => "endsWith",
            Function::Contains => "contains",
            Function::Length => "length",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Where => "where",
            Function::Select => "select",
            Function::First => "first",
            Function::Last => "last",
            Function::Distinct => "distinct",
            Function::IsDistinct => "isDistinct",
            Function::AllTrue => "allTrue",
            Function::AnyTrue => "anyTrue",
            Function::Iif => "iif",
            Function::Children => "children",
            Function::Descendants => "descendants",
            Function::Extension => "extension",
            Function::Trace => "trace",
        }
    }

    /// Accepted argument count range (inclusive)
    pub fn arity(self) -> (usize, usize) {
        match self {
            Function::Exists => (0, 1),
            Function::All | Function::Where | Function::Select => (1, 1),
            Function::StartsWith | Function::EndsWith | Function::Contains => (1, 1),
            Function::Extension | Function::Trace => (1, 1),
            Function::Iif => (2, 3),
            Function::Empty
            | Function::Not
            | Function::Count
            | Function::HasValue
            | Function::Length
            | Function::Lower
            | Function::Upper
            | Function::First
            | Function::Last
            | Function::Distinct
            | Function::IsDistinct
            | Function::AllTrue
            | Function::AnyTrue
            | Function::Children
            | Function::Descendants => (0, 0),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Environment variables and constants, resolved at compile time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextVariable {
    /// `$this`: the current focus item
    This,
    /// `%context`: the node the rule is evaluated on
    Context,
    /// `%resource`, `%rootResource`: the root of the instance tree
    Resource,
    /// `$parent`, `%parent`: the parent of the context node
    Parent,
    /// `%ucum`
    Ucum,
    /// `%sct`
    Sct,
    /// `%loinc`
    Loinc,
    /// `%vs-name`: canonical URL of a core value set
    ValueSet(String),
    /// `%ext-name`: canonical URL of a core extension
    ExtensionUrl(String),
}

impl ContextVariable {
    /// Resolve a variable or constant name (without `$`/`%`)
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "this" => ContextVariable::This,
            "context" => ContextVariable::Context,
            "resource" | "rootResource" => ContextVariable::Resource,
            "parent" => ContextVariable::Parent,
            "ucum" => ContextVariable::Ucum,
            "sct" => ContextVariable::Sct,
            "loinc" => ContextVariable::Loinc,
            _ => {
                if let Some(value_set) = name.strip_prefix("vs-") {
                    ContextVariable::ValueSet(value_set.to_string())
                } else if let Some(extension) = name.strip_prefix("ext-") {
                    ContextVariable::ExtensionUrl(extension.to_string())
                } else {
                    return None;
                }
            }
        })
    }

    /// Constant string value, for the variables that denote one
    pub fn constant_value(&self) -> Option<String> {
        match self {
            ContextVariable::Ucum => Some("http://unitsofmeasure.org".to_string()),
            ContextVariable::Sct => Some("http://snomed.info/sct".to_string()),
            ContextVariable::Loinc => Some("http://loinc.org".to_string()),
            ContextVariable::ValueSet(name) => {
                Some(format!("http://hl7.org/fhir/ValueSet/{name}"))
            }
            ContextVariable::ExtensionUrl(name) => {
                Some(format!("http://hl7.org/fhir/StructureDefinition/{name}"))
            }
            ContextVariable::This
            | ContextVariable::Context
            | ContextVariable::Resource
            | ContextVariable::Parent => None,
        }
    }
}

/// Target of a type predicate (`is`, `as`, `ofType`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpecifier {
    /// A system primitive kind (`Decimal`, `System.String`)
    System(LiteralKind),
    /// Any other type name, matched against node declared types (`Quantity`, `code`)
    Named(String),
}

impl TypeSpecifier {
    /// Resolve a (possibly qualified) type name
    pub fn resolve(name: &str) -> Self {
        match LiteralKind::from_system_name(name) {
            Some(kind) => TypeSpecifier::System(kind),
            None => TypeSpecifier::Named(name.strip_prefix("FHIR.").unwrap_or(name).to_string()),
        }
    }
}

impl fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpecifier::System(kind) => write!(f, "{kind}"),
            TypeSpecifier::Named(name) => f.write_str(name),
        }
    }
}

/// How a type predicate uses its match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTestMode {
    /// `is`: singleton boolean
    Is,
    /// `as`: the item when it matches, otherwise empty
    As,
    /// `ofType`: every matching item
    OfType,
}

/// Pattern argument of `matches`
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal pattern compiled together with the expression
    Compiled(Arc<Regex>),
    /// Pattern computed at evaluation time
    Dynamic(Box<Expr>),
}

/// Compiled expression tree
///
/// Receivers are optional: `None` means the implicit input of the enclosing
/// invocation (the context node at the top, the current item inside criteria).
#[derive(Debug, Clone)]
pub enum Expr {
    /// Typed literal
    Literal(PrimitiveValue),
    /// `{}`
    Empty,
    /// Environment variable or constant
    Variable(ContextVariable),
    /// Element navigation
    Member {
        /// Receiver
        base: Option<Box<Expr>>,
        /// Element name
        name: String,
    },
    /// Indexer
    Index {
        /// Receiver
        base: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// Built-in function invocation
    Call {
        /// Receiver
        base: Option<Box<Expr>>,
        /// Resolved function
        function: Function,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `matches(pattern)`
    Matches {
        /// Receiver
        base: Option<Box<Expr>>,
        /// Pattern
        pattern: Pattern,
    },
    /// Type predicate
    TypeTest {
        /// Receiver
        base: Option<Box<Expr>>,
        /// Target type
        target: TypeSpecifier,
        /// Predicate flavour
        mode: TypeTestMode,
    },
    /// Binary operator
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operator
    Unary {
        /// Operator
        op: UnaryOperator,
        /// Operand
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Visit this node and every sub-expression, parents first
    pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Empty | Expr::Variable(_) => {}
            Expr::Member { base, .. } | Expr::TypeTest { base, .. } => {
                if let Some(base) = base {
                    base.walk(visit);
                }
            }
            Expr::Index { base, index } => {
                base.walk(visit);
                index.walk(visit);
            }
            Expr::Call { base, args, .. } => {
                if let Some(base) = base {
                    base.walk(visit);
                }
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Matches { base, pattern } => {
                if let Some(base) = base {
                    base.walk(visit);
                }
                if let Pattern::Dynamic(pattern) = pattern {
                    pattern.walk(visit);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
        }
    }
}

/// Reusable compiled form of one expression
///
/// Cheap to clone; the tree is shared and immutable, so one compiled expression
/// serves any number of evaluations on any number of trees.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: Arc<str>,
    root: Arc<Expr>,
}

impl CompiledExpression {
    pub(crate) fn new(source: &str, root: Expr) -> Self {
        Self {
            source: Arc::from(source),
            root: Arc::new(root),
        }
    }

    /// Original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root of the compiled tree
    pub fn expr(&self) -> &Expr {
        &self.root
    }

    /// Whether the expression refers to the parent of the context node
    pub fn references_parent(&self) -> bool {
        let mut found = false;
        self.root.walk(&mut |expr| {
            found |= matches!(expr, Expr::Variable(ContextVariable::Parent));
        });
        found
    }

    /// Whether the expression still indexes by a choice marker (`value[x]`)
    pub fn has_choice_marker(&self) -> bool {
        let mut found = false;
        self.root.walk(&mut |expr| {
            if let Expr::Index { index, .. } = expr {
                found |= matches!(&**index, Expr::Member { base: None, name } if name == "x");
            }
        });
        found
    }

    /// Type specifiers used by type predicates, in source order
    pub fn type_tests(&self) -> Vec<&TypeSpecifier> {
        let mut targets = Vec::new();
        self.root.walk(&mut |expr| {
            if let Expr::TypeTest { target, .. } = expr {
                targets.push(target);
            }
        });
        targets
    }

    /// Element names navigated by the expression, in source order
    pub fn member_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.walk(&mut |expr| {
            if let Expr::Member { name, .. } = expr {
                names.push(name.as_str());
            }
        });
        names
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
