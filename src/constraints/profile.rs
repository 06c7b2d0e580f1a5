//! Already-parsed profile differentials
//!
//! Only the parts of a profile that carry invariants are modelled: the
//! constrained type and, per differential element, its path and constraints.
//! Reading profile documents is left to the caller; these structures
//! deserialize from the usual JSON shape.

use super::rule::Severity;
use serde::{Deserialize, Serialize};

/// Differential of one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDifferential {
    /// Canonical URL of the profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Constrained type (`Patient`)
    #[serde(rename = "type")]
    pub type_name: String,
    /// Differential elements
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementDefinition>,
}

/// Differential element carrying constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Element path (`Patient.contact`)
    pub path: String,
    /// Constraints declared on the element
    #[serde(default, rename = "constraint")]
    pub constraints: Vec<ElementConstraint>,
}

/// Constraint declared on a differential element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementConstraint {
    /// Rule key
    pub key: String,
    /// Issue grade
    pub severity: Severity,
    /// Human-readable description
    #[serde(default)]
    pub human: String,
    /// Expression; constraints without one are skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl ProfileDifferential {
    /// Create a differential for a type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            url: None,
            type_name: type_name.into(),
            elements: Vec::new(),
        }
    }

    /// Add one constraint on an element path
    pub fn with_constraint(
        mut self,
        path: impl Into<String>,
        key: impl Into<String>,
        severity: Severity,
        expression: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let constraint = ElementConstraint {
            key: key.into(),
            severity,
            human: String::new(),
            expression: Some(expression.into()),
        };
        match self.elements.iter_mut().find(|element| element.path == path) {
            Some(element) => element.constraints.push(constraint),
            None => self.elements.push(ElementDefinition {
                path,
                constraints: vec![constraint],
            }),
        }
        self
    }
}
