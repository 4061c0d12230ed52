// Copyright 2025 Cowboy AI, LLC.

//! Per-call invocation contexts
//!
//! A context is created when a chained method is entered, walked while the
//! chain runs, and dropped when the call returns. Both variants advance a
//! single cursor, so every candidate runs at most once no matter how often a
//! body asks for the rest of the chain.

pub mod invocation;
pub mod message;

pub use invocation::InvocationContext;
pub use message::{MessageContext, Response};

use crate::descriptor::MethodSignature;
use crate::errors::{InvocationError, InvocationResult};
use crate::value::{ObjectRef, Value};

/// What a continuation-aware body can do with the chain it was called from
pub trait Continuation {
    /// The composite's target record
    fn target(&self) -> &ObjectRef;

    /// Signature of the method being dispatched
    fn signature(&self) -> &MethodSignature;

    /// Current positional arguments
    fn arguments(&self) -> &[Value];

    /// One positional argument
    fn argument(&self, index: usize) -> InvocationResult<&Value> {
        self.arguments()
            .get(index)
            .ok_or(InvocationError::MissingArgument(index))
    }

    /// Candidates not yet run
    fn remaining(&self) -> usize;

    /// Run the rest of the chain
    ///
    /// Past the last candidate this yields the method's nil value.
    fn proceed(&mut self) -> InvocationResult<Value>;
}
