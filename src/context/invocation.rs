// Copyright 2025 Cowboy AI, LLC.

//! Generic chain context

use tracing::trace;

use super::Continuation;
use crate::chain::{Candidate, MethodEntry};
use crate::composite::CompositeInstance;
use crate::descriptor::{CallFrame, Implementation, MethodSignature, StateRef};
use crate::errors::{InvocationError, InvocationResult};
use crate::value::{cast_to_shape, is_nil, nil_value, ObjectRef, Value};

/// Walks a chain for one top-level call
///
/// The first non-nil result of a plain body wins; nil results fall through to
/// the next candidate. A continuation-aware body receives the context itself
/// and its answer ends the call: the remaining candidates run only if the
/// body calls [`Continuation::proceed`].
pub struct InvocationContext<'a> {
    instance: &'a CompositeInstance,
    entry: &'a MethodEntry,
    chain: &'a [Candidate],
    cursor: usize,
    arguments: Vec<Value>,
}

impl<'a> InvocationContext<'a> {
    /// Context positioned before the first candidate
    pub fn new(
        instance: &'a CompositeInstance,
        entry: &'a MethodEntry,
        chain: &'a [Candidate],
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            instance,
            entry,
            chain,
            cursor: 0,
            arguments,
        }
    }

    fn next_candidate(&mut self) -> Option<&'a Candidate> {
        let chain = self.chain;
        let candidate = chain.get(self.cursor)?;
        self.cursor += 1;
        Some(candidate)
    }
}

impl Continuation for InvocationContext<'_> {
    fn target(&self) -> &ObjectRef {
        self.instance.target()
    }

    fn signature(&self) -> &MethodSignature {
        &self.entry.signature
    }

    fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.cursor)
    }

    fn proceed(&mut self) -> InvocationResult<Value> {
        let entry = self.entry;
        let instance = self.instance;
        let returns = &entry.signature.returns;

        while let Some(candidate) = self.next_candidate() {
            trace!(method = %entry.key, source = %candidate.source, "Invoking chain candidate");
            let state = instance.state_for(&candidate.source)?;
            let state_ref = StateRef::new(state.as_deref());

            match &candidate.implementation {
                Implementation::Plain(body) => {
                    let frame = CallFrame::new(instance.target(), state_ref, &self.arguments);
                    let value = cast_to_shape(body(&frame)?, returns);
                    if !is_nil(returns, &value) {
                        return Ok(value);
                    }
                }
                Implementation::Continuing(body) => {
                    // The rest of the chain runs only through the body's own proceed
                    let chain: &mut dyn Continuation = &mut *self;
                    let value = cast_to_shape(body(state_ref, chain)?, returns);
                    return Ok(if is_nil(returns, &value) {
                        nil_value(returns)
                    } else {
                        value
                    });
                }
                Implementation::Message(_) => {
                    return Err(InvocationError::Internal(format!(
                        "message body for {} reached a generic chain",
                        entry.key
                    )));
                }
            }
        }

        Ok(nil_value(returns))
    }
}
