// Copyright 2025 Cowboy AI, LLC.

//! Base types a composite extends

use super::implementation::{CallFrame, PlainBody};
use super::signature::MethodSignature;
use crate::errors::InvocationResult;
use crate::value::Value;
use std::sync::Arc;

/// A method of a base type; abstract when it has no body
#[derive(Clone)]
pub struct BaseMethod {
    /// Declared signature
    pub signature: MethodSignature,
    /// Concrete body, if any
    pub body: Option<PlainBody>,
}

impl BaseMethod {
    /// Whether the method has no body
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }
}

impl std::fmt::Debug for BaseMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseMethod")
            .field("signature", &self.signature)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// A concrete type the composite extends
#[derive(Debug, Clone)]
pub struct BaseType {
    /// Type name, registered in the catalog's type hierarchy
    pub name: String,
    /// Direct supertypes
    pub supertypes: Vec<String>,
    /// Declared methods
    pub methods: Vec<BaseMethod>,
}

impl BaseType {
    /// Base type with no methods
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a supertype
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.supertypes.push(parent.into());
        self
    }

    /// Add a concrete method
    pub fn concrete<F>(mut self, signature: MethodSignature, body: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> InvocationResult<Value> + Send + Sync + 'static,
    {
        self.methods.push(BaseMethod {
            signature,
            body: Some(Arc::new(body)),
        });
        self
    }

    /// Add an abstract method
    pub fn abstract_method(mut self, signature: MethodSignature) -> Self {
        self.methods.push(BaseMethod {
            signature,
            body: None,
        });
        self
    }
}
