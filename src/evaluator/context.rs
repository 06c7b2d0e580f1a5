//! Evaluation context for one rule on one node

use crate::model::ResourceNode;

/// Where an expression is evaluated
///
/// The ancestor chain is borrowed from the traversal stack of the validator;
/// nodes themselves know nothing about their parents.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    node: &'a ResourceNode,
    ancestors: &'a [&'a ResourceNode],
}

impl<'a> EvaluationContext<'a> {
    /// Context for the root of a tree
    pub fn new(root: &'a ResourceNode) -> Self {
        Self {
            node: root,
            ancestors: &[],
        }
    }

    /// Context for a nested node; `ancestors` runs from the root down to the parent
    pub fn with_ancestors(node: &'a ResourceNode, ancestors: &'a [&'a ResourceNode]) -> Self {
        Self { node, ancestors }
    }

    /// The node the rule is evaluated on (`%context`)
    pub fn node(&self) -> &'a ResourceNode {
        self.node
    }

    /// Root of the instance tree (`%resource`)
    pub fn root(&self) -> &'a ResourceNode {
        self.ancestors.first().copied().unwrap_or(self.node)
    }

    /// Parent of the context node, absent at the root
    pub fn parent(&self) -> Option<&'a ResourceNode> {
        self.ancestors.last().copied()
    }

    /// Ancestors from the root down to the parent
    pub fn ancestors(&self) -> &'a [&'a ResourceNode] {
        self.ancestors
    }
}
