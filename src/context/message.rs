// Copyright 2025 Cowboy AI, LLC.

//! Structured message context
//!
//! The call is modelled as a message: a target, positional parameters that
//! bodies may rewrite before delegating, and a response slot chosen by the
//! method's return shape. Message bodies see what earlier candidates
//! produced and decide whether the rest of the chain runs; plain bodies only
//! run until something answers.

use tracing::trace;

use super::Continuation;
use crate::chain::{Candidate, MethodEntry};
use crate::composite::CompositeInstance;
use crate::descriptor::{CallFrame, Implementation, MethodSignature, StateRef};
use crate::errors::{InvocationError, InvocationResult};
use crate::shape::Shape;
use crate::value::{cast_to_shape, is_nil, nil_value, ObjectRef, Value};

/// Accumulated answer of a message call
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Single object
    Object(Option<ObjectRef>),
    /// Single scalar
    Scalar(Option<Value>),
    /// Set of objects
    Objects(Vec<ObjectRef>),
    /// Set of scalars
    Scalars(Vec<Value>),
}

impl Response {
    /// Empty response slot for a return shape
    pub fn for_shape(shape: &Shape) -> Self {
        match shape {
            Shape::Set(inner) if inner.is_object_like() => Response::Objects(Vec::new()),
            Shape::Set(_) => Response::Scalars(Vec::new()),
            Shape::Object(_) => Response::Object(None),
            _ => Response::Scalar(None),
        }
    }

    /// Whether nothing has answered yet
    pub fn is_empty(&self) -> bool {
        match self {
            Response::Object(o) => o.is_none(),
            Response::Scalar(v) => v.is_none(),
            Response::Objects(items) => items.is_empty(),
            Response::Scalars(items) => items.is_empty(),
        }
    }

    /// Replace the response with a value already cast to the method's shape
    ///
    /// Returns false when the value does not fit the slot; the previous
    /// response is kept.
    pub fn absorb(&mut self, value: Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (Response::Object(slot), Value::Object(object)) => {
                *slot = Some(object);
                true
            }
            (Response::Objects(slot), Value::Set(items)) => {
                let objects: Option<Vec<ObjectRef>> = items
                    .into_iter()
                    .map(|v| match v {
                        Value::Object(o) => Some(o),
                        _ => None,
                    })
                    .collect();
                match objects {
                    Some(objects) => {
                        *slot = objects;
                        true
                    }
                    None => false,
                }
            }
            (Response::Scalars(slot), Value::Set(items)) => {
                *slot = items;
                true
            }
            (Response::Scalar(slot), value) if !matches!(value, Value::Object(_) | Value::Set(_)) => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Current response as a value of the given shape
    pub fn to_value(&self, shape: &Shape) -> Value {
        match self {
            Response::Object(Some(o)) => Value::Object(o.clone()),
            Response::Scalar(Some(v)) => v.clone(),
            Response::Objects(items) if !items.is_empty() => {
                Value::Set(items.iter().cloned().map(Value::Object).collect())
            }
            Response::Scalars(items) if !items.is_empty() => Value::Set(items.clone()),
            _ => nil_value(shape),
        }
    }
}

/// Walks a chain that contains message-convention bodies
///
/// Plain bodies run while the response is empty. A message or continuing
/// body is the last candidate a `proceed` call reaches on its own; the rest
/// of the chain runs only if that body proceeds.
pub struct MessageContext<'a> {
    instance: &'a CompositeInstance,
    entry: &'a MethodEntry,
    chain: &'a [Candidate],
    cursor: usize,
    parameters: Vec<Value>,
    response: Response,
}

impl<'a> MessageContext<'a> {
    /// Context with an empty response, positioned before the first candidate
    pub fn new(
        instance: &'a CompositeInstance,
        entry: &'a MethodEntry,
        chain: &'a [Candidate],
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            instance,
            entry,
            chain,
            cursor: 0,
            parameters,
            response: Response::for_shape(&entry.signature.returns),
        }
    }

    /// Parameter by position
    pub fn parameter(&self, index: usize) -> InvocationResult<&Value> {
        self.parameters
            .get(index)
            .ok_or(InvocationError::MissingArgument(index))
    }

    /// Parameter by external identifier (or declared name)
    pub fn parameter_by_id(&self, id: &str) -> InvocationResult<&Value> {
        let index = self.index_of(id)?;
        self.parameter(index)
    }

    /// Rewrite a parameter for the candidates that follow
    pub fn set_parameter(&mut self, index: usize, value: Value) -> InvocationResult<()> {
        let slot = self
            .parameters
            .get_mut(index)
            .ok_or(InvocationError::MissingArgument(index))?;
        *slot = value;
        Ok(())
    }

    /// Rewrite a parameter addressed by external identifier
    pub fn set_parameter_by_id(&mut self, id: &str, value: Value) -> InvocationResult<()> {
        let index = self.index_of(id)?;
        self.set_parameter(index, value)
    }

    /// The accumulated response
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// The accumulated response as a value of the method's shape
    pub fn response_value(&self) -> Value {
        self.response.to_value(&self.entry.signature.returns)
    }

    /// Overwrite the response; a nil value leaves it unchanged
    pub fn set_response(&mut self, value: Value) {
        let returns = &self.entry.signature.returns;
        let value = cast_to_shape(value, returns);
        if !is_nil(returns, &value) {
            self.response.absorb(value);
        }
    }

    fn index_of(&self, id: &str) -> InvocationResult<usize> {
        self.entry
            .signature
            .parameter_index(id)
            .ok_or_else(|| InvocationError::UnknownParameter(id.to_string()))
    }

    fn next_candidate(&mut self) -> Option<&'a Candidate> {
        let chain = self.chain;
        let candidate = chain.get(self.cursor)?;
        self.cursor += 1;
        Some(candidate)
    }
}

impl Continuation for MessageContext<'_> {
    fn target(&self) -> &ObjectRef {
        self.instance.target()
    }

    fn signature(&self) -> &MethodSignature {
        &self.entry.signature
    }

    fn arguments(&self) -> &[Value] {
        &self.parameters
    }

    fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.cursor)
    }

    fn proceed(&mut self) -> InvocationResult<Value> {
        let entry = self.entry;
        let instance = self.instance;

        while let Some(candidate) = self.next_candidate() {
            if !candidate.implementation.is_continuation_aware() && !self.response.is_empty() {
                trace!(method = %entry.key, source = %candidate.source, "Skipping plain candidate, response present");
                continue;
            }
            trace!(method = %entry.key, source = %candidate.source, "Invoking message candidate");
            let state = instance.state_for(&candidate.source)?;
            let state_ref = StateRef::new(state.as_deref());

            match &candidate.implementation {
                Implementation::Plain(body) => {
                    let frame = CallFrame::new(instance.target(), state_ref, &self.parameters);
                    let raw = body(&frame)?;
                    self.set_response(raw);
                }
                Implementation::Continuing(body) => {
                    let chain: &mut dyn Continuation = &mut *self;
                    let raw = body(state_ref, chain)?;
                    self.set_response(raw);
                    break;
                }
                Implementation::Message(body) => {
                    let raw = body(state_ref, &mut *self)?;
                    self.set_response(raw);
                    break;
                }
            }
        }

        Ok(self.response_value())
    }
}
