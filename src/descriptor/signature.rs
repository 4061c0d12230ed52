// Copyright 2025 Cowboy AI, LLC.

//! Method signatures declared by roles, behaviours and base types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shape::Shape;

/// A declared method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Declared shape
    pub shape: Shape,
    /// Stable external identifier used by message-style bodies
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Signature of a contract method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Method name
    pub name: String,
    /// Declared return shape
    pub returns: Shape,
    /// Literal parameter list
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Stable external identifier
    #[serde(default)]
    pub external_id: Option<String>,
    /// Declared parameter shape that overrides the literal list for collation
    #[serde(default)]
    pub fixed_parameters: Option<Vec<Shape>>,
    /// Declarative tags carried by the method
    #[serde(default)]
    pub tags: Vec<String>,
    /// Static methods never take part in composition
    #[serde(default)]
    pub is_static: bool,
    /// Marks an already synthetic bridge
    #[serde(default)]
    pub is_bridge: bool,
}

impl MethodSignature {
    /// Signature with no parameters
    pub fn new(name: impl Into<String>, returns: Shape) -> Self {
        Self {
            name: name.into(),
            returns,
            parameters: Vec::new(),
            external_id: None,
            fixed_parameters: None,
            tags: Vec::new(),
            is_static: false,
            is_bridge: false,
        }
    }

    /// Append a parameter
    pub fn param(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            shape,
            external_id: None,
        });
        self
    }

    /// Append a parameter addressable by an external identifier
    pub fn param_with_id(
        mut self,
        name: impl Into<String>,
        shape: Shape,
        external_id: impl Into<String>,
    ) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            shape,
            external_id: Some(external_id.into()),
        });
        self
    }

    /// Set the external identifier
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Override the parameter shape used for collation
    pub fn with_fixed_parameters(mut self, shapes: Vec<Shape>) -> Self {
        self.fixed_parameters = Some(shapes);
        self
    }

    /// Add a declarative tag
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as a synthetic bridge
    pub fn as_bridge(mut self) -> Self {
        self.is_bridge = true;
        self
    }

    /// Parameter shape used for collation
    pub fn parameter_shape(&self) -> Vec<Shape> {
        match &self.fixed_parameters {
            Some(fixed) => fixed.clone(),
            None => self.parameters.iter().map(|p| p.shape.clone()).collect(),
        }
    }

    /// Number of positional arguments a caller supplies
    pub fn arity(&self) -> usize {
        self.parameter_shape().len()
    }

    /// Collision rank: one point per tag, minus one for a fixed parameter shape
    pub fn rank(&self) -> i64 {
        let penalty = if self.fixed_parameters.is_some() { 1 } else { 0 };
        self.tags.len() as i64 - penalty
    }

    /// Whether two signatures share name and parameter shape
    pub fn same_call_shape(&self, other: &MethodSignature) -> bool {
        self.name == other.name && self.parameter_shape() == other.parameter_shape()
    }

    /// Position of a parameter by its external identifier or name
    pub fn parameter_index(&self, id: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| p.external_id.as_deref() == Some(id))
            .or_else(|| self.parameters.iter().position(|p| p.name == id))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameter_shape().iter().map(|s| s.to_string()).collect();
        write!(f, "{}({}): {}", self.name, params.join(", "), self.returns)
    }
}
