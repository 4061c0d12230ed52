// Copyright 2025 Cowboy AI, LLC.

//! Method bodies and behaviour constructors

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::context::{Continuation, MessageContext};
use crate::errors::{InvocationError, InvocationResult};
use crate::value::{ObjectRef, Value};

/// Per-instance state of one behaviour
pub type BehaviourState = Arc<dyn Any + Send + Sync>;

/// Body invoked with re-projected positional arguments
pub type PlainBody = Arc<dyn Fn(&CallFrame<'_>) -> InvocationResult<Value> + Send + Sync>;

/// Body that receives the chain and may continue it
pub type ContinuingBody =
    Arc<dyn Fn(StateRef<'_>, &mut dyn Continuation) -> InvocationResult<Value> + Send + Sync>;

/// Body that receives the structured message
pub type MessageBody =
    Arc<dyn Fn(StateRef<'_>, &mut MessageContext<'_>) -> InvocationResult<Value> + Send + Sync>;

/// Borrowed view of a behaviour's state, if the candidate has one
#[derive(Clone, Copy)]
pub struct StateRef<'a> {
    state: Option<&'a (dyn Any + Send + Sync)>,
}

impl<'a> StateRef<'a> {
    /// Wrap optional state
    pub fn new(state: Option<&'a (dyn Any + Send + Sync)>) -> Self {
        Self { state }
    }

    /// A candidate without behaviour state (role defaults, base bodies)
    pub fn none() -> Self {
        Self { state: None }
    }

    /// Borrow the state as its concrete type
    pub fn get<T: Any>(&self) -> InvocationResult<&'a T> {
        self.state
            .and_then(|s| s.downcast_ref::<T>())
            .ok_or(InvocationError::StateMismatch {
                expected: type_name::<T>(),
            })
    }

    /// Whether any state is attached
    pub fn is_present(&self) -> bool {
        self.state.is_some()
    }
}

/// Everything a plain body sees
pub struct CallFrame<'a> {
    target: &'a ObjectRef,
    state: StateRef<'a>,
    arguments: &'a [Value],
}

impl<'a> CallFrame<'a> {
    /// Assemble a frame
    pub fn new(target: &'a ObjectRef, state: StateRef<'a>, arguments: &'a [Value]) -> Self {
        Self {
            target,
            state,
            arguments,
        }
    }

    /// The composite's target record
    pub fn target(&self) -> &'a ObjectRef {
        self.target
    }

    /// Behaviour state as its concrete type
    pub fn state<T: Any>(&self) -> InvocationResult<&'a T> {
        self.state.get::<T>()
    }

    /// All positional arguments
    pub fn arguments(&self) -> &'a [Value] {
        self.arguments
    }

    /// One positional argument
    pub fn arg(&self, index: usize) -> InvocationResult<&'a Value> {
        self.arguments
            .get(index)
            .ok_or(InvocationError::MissingArgument(index))
    }
}

/// A method body, tagged by calling convention
#[derive(Clone)]
pub enum Implementation {
    /// Receives plain arguments; a nil result lets the chain continue
    Plain(PlainBody),
    /// Receives the chain and decides when to continue it
    Continuing(ContinuingBody),
    /// Receives the structured message
    Message(MessageBody),
}

impl Implementation {
    /// Plain body from a closure
    pub fn plain<F>(body: F) -> Self
    where
        F: Fn(&CallFrame<'_>) -> InvocationResult<Value> + Send + Sync + 'static,
    {
        Implementation::Plain(Arc::new(body))
    }

    /// Continuation-aware body from a closure
    pub fn continuing<F>(body: F) -> Self
    where
        F: Fn(StateRef<'_>, &mut dyn Continuation) -> InvocationResult<Value>
            + Send
            + Sync
            + 'static,
    {
        Implementation::Continuing(Arc::new(body))
    }

    /// Message body from a closure
    pub fn message<F>(body: F) -> Self
    where
        F: Fn(StateRef<'_>, &mut MessageContext<'_>) -> InvocationResult<Value>
            + Send
            + Sync
            + 'static,
    {
        Implementation::Message(Arc::new(body))
    }

    /// Whether the body takes part in continuation
    pub fn is_continuation_aware(&self) -> bool {
        !matches!(self, Implementation::Plain(_))
    }

    /// Whether the body uses the message convention
    pub fn is_message(&self) -> bool {
        matches!(self, Implementation::Message(_))
    }

    /// Short label for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Implementation::Plain(_) => "plain",
            Implementation::Continuing(_) => "continuing",
            Implementation::Message(_) => "message",
        }
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Implementation::{}", self.kind())
    }
}

/// How a behaviour slot is created
#[derive(Clone)]
pub enum Constructor {
    /// No arguments
    Default(Arc<dyn Fn() -> InvocationResult<BehaviourState> + Send + Sync>),
    /// Receives the composite's target
    WithTarget(Arc<dyn Fn(&ObjectRef) -> InvocationResult<BehaviourState> + Send + Sync>),
}

impl Constructor {
    /// Construct `T::default()`
    pub fn default_of<T: Default + Any + Send + Sync>() -> Self {
        Constructor::Default(Arc::new(|| Ok(Arc::new(T::default()) as BehaviourState)))
    }

    /// Construct from the target
    pub fn with_target<T, F>(build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ObjectRef) -> InvocationResult<T> + Send + Sync + 'static,
    {
        Constructor::WithTarget(Arc::new(move |target| {
            build(target).map(|state| Arc::new(state) as BehaviourState)
        }))
    }

    /// Run the constructor
    pub fn construct(&self, target: &ObjectRef) -> InvocationResult<BehaviourState> {
        match self {
            Constructor::Default(build) => build(),
            Constructor::WithTarget(build) => build(target),
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Default(_) => f.write_str("Constructor::Default"),
            Constructor::WithTarget(_) => f.write_str("Constructor::WithTarget"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(u32);

    #[test]
    fn test_state_ref_downcasts() {
        let state: BehaviourState = Arc::new(Counter(3));
        let view = StateRef::new(Some(state.as_ref()));
        assert_eq!(view.get::<Counter>().unwrap().0, 3);
        assert!(matches!(
            view.get::<String>(),
            Err(InvocationError::StateMismatch { .. })
        ));
        assert!(StateRef::none().get::<Counter>().is_err());
    }

    #[test]
    fn test_constructor_with_target() {
        let target = ObjectRef::new("Circle", 2.5f64);
        let ctor = Constructor::with_target(|t: &ObjectRef| {
            Ok(Counter(*t.downcast_ref::<f64>().unwrap() as u32))
        });
        let state = ctor.construct(&target).unwrap();
        assert_eq!(state.downcast_ref::<Counter>().unwrap().0, 2);
    }

    #[test]
    fn test_call_frame_arguments() {
        let target = ObjectRef::new("Circle", ());
        let args = vec![Value::Int(1)];
        let frame = CallFrame::new(&target, StateRef::none(), &args);
        assert_eq!(frame.arg(0).unwrap(), &Value::Int(1));
        assert!(matches!(frame.arg(1), Err(InvocationError::MissingArgument(1))));
    }

    #[test]
    fn test_implementation_kind() {
        let plain = Implementation::plain(|_| Ok(Value::Null));
        assert!(!plain.is_continuation_aware());
        let cont = Implementation::continuing(|_, chain| chain.proceed());
        assert!(cont.is_continuation_aware());
        assert!(!cont.is_message());
    }
}
