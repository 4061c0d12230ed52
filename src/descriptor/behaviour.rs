// Copyright 2025 Cowboy AI, LLC.

//! Behaviour modules: concrete bodies for role methods

use serde::{Deserialize, Serialize};
use std::any::Any;

use super::implementation::{
    CallFrame, Constructor, Implementation, StateRef,
};
use super::signature::MethodSignature;
use crate::context::{Continuation, MessageContext};
use crate::errors::InvocationResult;
use crate::value::Value;

/// Declared "runs before" / "runs after" edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precedence {
    /// Behaviours this one must run before
    pub before: Vec<String>,
    /// Behaviours this one must run after
    pub after: Vec<String>,
}

impl Precedence {
    /// Whether any edge is declared
    pub fn is_declared(&self) -> bool {
        !self.before.is_empty() || !self.after.is_empty()
    }

    /// Merge another set of edges into this one
    pub fn merged(&self, other: &Precedence) -> Precedence {
        let mut merged = self.clone();
        for name in &other.before {
            if !merged.before.contains(name) {
                merged.before.push(name.clone());
            }
        }
        for name in &other.after {
            if !merged.after.contains(name) {
                merged.after.push(name.clone());
            }
        }
        merged
    }
}

/// A body a behaviour provides for one signature
#[derive(Debug, Clone)]
pub struct BehaviourMethod {
    /// Signature the body implements
    pub signature: MethodSignature,
    /// The body
    pub implementation: Implementation,
    /// Edges that apply only to this method
    pub precedence: Precedence,
}

/// A behaviour module
#[derive(Debug, Clone)]
pub struct BehaviourDescriptor {
    /// Unique behaviour name
    pub name: String,
    /// Roles this behaviour brings into the composition
    pub provides: Vec<String>,
    /// Behaviours that must be composed alongside this one
    pub requires: Vec<String>,
    /// How the per-instance slot is built; `None` means not instantiable
    pub constructor: Option<Constructor>,
    /// Edges that apply to every method of the behaviour
    pub precedence: Precedence,
    /// Tagged as using the message calling convention
    pub message_style: bool,
    /// Provided bodies
    pub methods: Vec<BehaviourMethod>,
}

impl BehaviourDescriptor {
    /// Start building a behaviour
    pub fn builder(name: impl Into<String>) -> BehaviourBuilder {
        BehaviourBuilder {
            behaviour: BehaviourDescriptor {
                name: name.into(),
                provides: Vec::new(),
                requires: Vec::new(),
                constructor: None,
                precedence: Precedence::default(),
                message_style: false,
                methods: Vec::new(),
            },
        }
    }

    /// Whether the behaviour is treated as message-style for ordering
    pub fn is_message_style(&self) -> bool {
        self.message_style || self.methods.iter().any(|m| m.implementation.is_message())
    }

    /// Effective edges for one of the behaviour's methods
    pub fn precedence_for(&self, method: &BehaviourMethod) -> Precedence {
        self.precedence.merged(&method.precedence)
    }
}

/// Builder for [`BehaviourDescriptor`]
pub struct BehaviourBuilder {
    behaviour: BehaviourDescriptor,
}

impl BehaviourBuilder {
    /// Use the given constructor
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.behaviour.constructor = Some(constructor);
        self
    }

    /// Slot state is `T::default()`
    pub fn state<T: Default + Any + Send + Sync>(self) -> Self {
        self.constructor(Constructor::default_of::<T>())
    }

    /// Behaviour carries no state
    pub fn stateless(self) -> Self {
        self.state::<()>()
    }

    /// Bring a role into the composition
    pub fn provides(mut self, role: impl Into<String>) -> Self {
        self.behaviour.provides.push(role.into());
        self
    }

    /// Require another behaviour
    pub fn requires(mut self, behaviour: impl Into<String>) -> Self {
        self.behaviour.requires.push(behaviour.into());
        self
    }

    /// Run before another behaviour on every shared method
    pub fn runs_before(mut self, behaviour: impl Into<String>) -> Self {
        self.behaviour.precedence.before.push(behaviour.into());
        self
    }

    /// Run after another behaviour on every shared method
    pub fn runs_after(mut self, behaviour: impl Into<String>) -> Self {
        self.behaviour.precedence.after.push(behaviour.into());
        self
    }

    /// Tag as message-style
    pub fn message_style(mut self) -> Self {
        self.behaviour.message_style = true;
        self
    }

    /// Add a prepared method
    pub fn method(mut self, method: BehaviourMethod) -> Self {
        self.behaviour.methods.push(method);
        self
    }

    /// Add a body with method-specific edges
    pub fn implement(
        self,
        signature: MethodSignature,
        implementation: Implementation,
        precedence: Precedence,
    ) -> Self {
        self.method(BehaviourMethod {
            signature,
            implementation,
            precedence,
        })
    }

    /// Add a plain body
    pub fn plain<F>(self, signature: MethodSignature, body: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> InvocationResult<Value> + Send + Sync + 'static,
    {
        self.implement(signature, Implementation::plain(body), Precedence::default())
    }

    /// Add a continuation-aware body
    pub fn continuing<F>(self, signature: MethodSignature, body: F) -> Self
    where
        F: Fn(StateRef<'_>, &mut dyn Continuation) -> InvocationResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.implement(signature, Implementation::continuing(body), Precedence::default())
    }

    /// Add a message body
    pub fn message<F>(self, signature: MethodSignature, body: F) -> Self
    where
        F: Fn(StateRef<'_>, &mut MessageContext<'_>) -> InvocationResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.implement(signature, Implementation::message(body), Precedence::default())
    }

    /// Finish the behaviour
    pub fn build(self) -> BehaviourDescriptor {
        self.behaviour
    }
}
