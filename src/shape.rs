// Copyright 2025 Cowboy AI, LLC.

//! Declared shapes and the type hierarchy used for assignability

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the universal object type every object type extends
pub const UNIVERSAL_TYPE: &str = "Object";

/// Name of an object type (record type, role, or base type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(String);

impl TypeName {
    /// Create a type name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The universal object type
    pub fn universal() -> Self {
        Self(UNIVERSAL_TYPE.to_string())
    }

    /// View the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the universal object type
    pub fn is_universal(&self) -> bool {
        self.0 == UNIVERSAL_TYPE
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Declared shape of a return value or parameter
///
/// Shapes are ordered and hashable so method keys collate the same way on
/// every run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shape {
    /// No result
    Void,
    /// Boolean scalar
    Bool,
    /// Integer scalar
    Int,
    /// Floating point scalar
    Double,
    /// Text scalar
    Text,
    /// Reference to an object of the named type
    Object(TypeName),
    /// Set of elements of the inner shape
    Set(Box<Shape>),
}

impl Shape {
    /// Object shape for a type name
    pub fn object(name: impl Into<String>) -> Self {
        Shape::Object(TypeName::new(name))
    }

    /// Set shape wrapping an element shape
    pub fn set_of(element: Shape) -> Self {
        Shape::Set(Box::new(element))
    }

    /// Whether this is a set shape
    pub fn is_set(&self) -> bool {
        matches!(self, Shape::Set(_))
    }

    /// Whether this shape holds object references (directly or as set elements)
    pub fn is_object_like(&self) -> bool {
        match self {
            Shape::Object(_) => true,
            Shape::Set(inner) => inner.is_object_like(),
            _ => false,
        }
    }

    /// Element shape of a set, or the shape itself for scalars
    pub fn element(&self) -> &Shape {
        match self {
            Shape::Set(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Void => f.write_str("void"),
            Shape::Bool => f.write_str("bool"),
            Shape::Int => f.write_str("int"),
            Shape::Double => f.write_str("double"),
            Shape::Text => f.write_str("text"),
            Shape::Object(name) => write!(f, "{name}"),
            Shape::Set(inner) => write!(f, "set<{inner}>"),
        }
    }
}

/// Named object types and their declared supertypes
///
/// Every object type implicitly extends [`UNIVERSAL_TYPE`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeHierarchy {
    supertypes: IndexMap<TypeName, Vec<TypeName>>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type with its direct supertypes
    ///
    /// Declaring a type twice merges the supertype lists.
    pub fn declare(&mut self, name: impl Into<TypeName>, supertypes: Vec<TypeName>) {
        let entry = self.supertypes.entry(name.into()).or_default();
        for parent in supertypes {
            if !entry.contains(&parent) {
                entry.push(parent);
            }
        }
    }

    /// Whether a type has been declared
    pub fn contains(&self, name: &TypeName) -> bool {
        self.supertypes.contains_key(name)
    }

    /// All transitive supertypes of a type, nearest first, excluding itself
    pub fn ancestors(&self, name: &TypeName) -> IndexSet<TypeName> {
        let mut seen = IndexSet::new();
        let mut frontier = vec![name.clone()];
        while let Some(current) = frontier.pop() {
            if let Some(parents) = self.supertypes.get(&current) {
                for parent in parents {
                    if parent != name && seen.insert(parent.clone()) {
                        frontier.push(parent.clone());
                    }
                }
            }
        }
        seen
    }

    /// Whether `sub` is `sup` or one of its descendants
    pub fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        sub == sup || sup.is_universal() || self.ancestors(sub).contains(sup)
    }

    /// Whether a value of shape `from` can be used where `to` is expected
    pub fn is_assignable(&self, from: &Shape, to: &Shape) -> bool {
        match (from, to) {
            (Shape::Object(a), Shape::Object(b)) => self.is_subtype(a, b),
            (Shape::Set(a), Shape::Set(b)) => self.is_assignable(a, b),
            (a, b) => a == b,
        }
    }
}
