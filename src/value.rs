// Copyright 2025 Cowboy AI, LLC.

//! Runtime values flowing through composite dispatch
//!
//! Every shape has a *nil value* that means "no opinion": `0`, `false`, the
//! empty set or `Null`. Chains treat a nil result as permission to keep
//! looking instead of as a failure.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::shape::{Shape, TypeName};

/// Shared handle to an object of a named type
///
/// The payload is opaque to this crate; callers downcast it.
#[derive(Clone)]
pub struct ObjectRef {
    type_name: TypeName,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wrap a payload as an object of the given type
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<TypeName>, payload: T) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Arc::new(payload),
        }
    }

    /// Wrap an already shared payload
    pub fn from_arc(type_name: impl Into<TypeName>, payload: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// Declared type of the object
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Borrow the payload as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Whether two handles point at the same payload
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.same_object(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type_name", &self.type_name)
            .field("payload", &Arc::as_ptr(&self.payload))
            .finish()
    }
}

/// Dynamic value passed as an argument or returned from a body
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Double(f64),
    /// Text
    Text(String),
    /// Object reference
    Object(ObjectRef),
    /// Unordered collection (kept in insertion order)
    Set(Vec<Value>),
}

impl Value {
    /// Text value from anything string-like
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Whether this is a set value
    pub fn is_set(&self) -> bool {
        matches!(self, Value::Set(_))
    }

    /// Whether this value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean payload, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer payload, if any
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload, if any
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Set elements, if any
    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Set(value)
    }
}

/// The "no result" value for a shape
pub fn nil_value(shape: &Shape) -> Value {
    match shape {
        Shape::Void | Shape::Text | Shape::Object(_) => Value::Null,
        Shape::Bool => Value::Bool(false),
        Shape::Int => Value::Int(0),
        Shape::Double => Value::Double(0.0),
        Shape::Set(_) => Value::Set(Vec::new()),
    }
}

/// Whether a value carries no opinion for the given shape
pub fn is_nil(shape: &Shape, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Set(items) => items.is_empty() && shape.is_set(),
        other => *other == nil_value(shape),
    }
}

/// Adapt a value produced for one shape to the shape a caller expects
///
/// Scalars headed for a set are wrapped, sets headed for a scalar yield their
/// first element, and integers widen to doubles. Anything else passes through.
pub fn cast_to_shape(value: Value, target: &Shape) -> Value {
    match (value, target) {
        (_, Shape::Void) => Value::Null,
        (Value::Null, Shape::Set(_)) => Value::Set(Vec::new()),
        (Value::Set(items), Shape::Set(inner)) => {
            Value::Set(items.into_iter().map(|v| cast_to_shape(v, inner)).collect())
        }
        (scalar, Shape::Set(inner)) => Value::Set(vec![cast_to_shape(scalar, inner)]),
        (Value::Set(items), scalar) => match items.into_iter().next() {
            Some(first) => cast_to_shape(first, scalar),
            None => nil_value(scalar),
        },
        (Value::Int(i), Shape::Double) => Value::Double(i as f64),
        (value, _) => value,
    }
}
