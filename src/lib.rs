//! # CIM Composite
//!
//! Runtime composition of objects from roles and behaviour modules.
//!
//! A composite type is synthesized from a set of **roles** (contracts made of
//! method signatures) and **behaviours** (modules supplying method bodies).
//! Every method the roles declare gets an ordered chain of candidate bodies;
//! calling the method walks that chain until a candidate produces a non-nil
//! value.
//!
//! - **Catalog**: roles, behaviours, base types and the type and identifier
//!   hierarchies relating them
//! - **Collation**: role closure, method de-duplication and covariant-return
//!   bridges
//! - **Linearization**: per-method behaviour ordering from precedence edges and
//!   a configurable bias
//! - **Dispatch table**: `nil`, `direct`, `chain`, `message` or `bridge` for
//!   every method
//! - **Instances**: a target record plus lazily constructed behaviour state
//!
//! ## Design Principles
//!
//! 1. **Explicit tables**: a composite type is data, not generated code
//! 2. **Nil means "no opinion"**: chains fall through on nil, never on error
//! 3. **Deterministic**: the same request always yields the same ordering
//! 4. **All or nothing**: composition yields a complete descriptor or an error
//!
//! ```
//! use std::sync::Arc;
//! use cim_composite::{
//!     BehaviourDescriptor, Catalog, Composer, CompositionKey, MethodSignature,
//!     ObjectRef, RoleDescriptor, Shape, Value,
//! };
//!
//! let mut catalog = Catalog::new();
//! catalog.register_role(
//!     RoleDescriptor::builder("Shape")
//!         .method(MethodSignature::new("area", Shape::Double))
//!         .build(),
//! )?;
//! catalog.register_behaviour(
//!     BehaviourDescriptor::builder("Square")
//!         .stateless()
//!         .plain(MethodSignature::new("area", Shape::Double), |frame| {
//!             let side = frame.target().downcast_ref::<f64>().copied().unwrap_or(0.0);
//!             Ok(Value::Double(side * side))
//!         })
//!         .build(),
//! )?;
//!
//! let composer = Composer::new(Arc::new(catalog));
//! let square = composer.compose(&CompositionKey::new(["Shape"], ["Square"]))?;
//! let instance = square.instantiate(ObjectRef::new("Shape", 3.0f64));
//! assert_eq!(instance.invoke("area", vec![])?, Value::Double(9.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod chain;
pub mod collation;
pub mod composer;
pub mod composite;
pub mod config;
pub mod context;
pub mod descriptor;
mod errors;
pub mod ordering;
pub mod shape;
pub mod value;

pub use chain::{Candidate, CandidateSource, Convention, Dispatch, MethodEntry};
pub use collation::{ExcludedBehaviour, MethodKey};
pub use composer::{Composer, CompositeCache, CompositionKey};
pub use composite::{
    BehaviourSlot, CompositeInstance, CompositeSummary, CompositeTypeDescriptor, MethodSummary,
};
pub use config::ComposerConfig;
pub use context::{Continuation, InvocationContext, MessageContext, Response};
pub use descriptor::{
    BaseMethod, BaseType, BehaviourDescriptor, BehaviourState, CallFrame, Catalog, Constructor,
    Implementation, MethodSignature, Parameter, Precedence, RoleDescriptor, StateRef,
};
pub use errors::{CompositionError, CompositionResult, InvocationError, InvocationResult};
pub use ordering::{linear_extension, CyclicOrder, Linearizer};
pub use shape::{Shape, TypeHierarchy, TypeName, UNIVERSAL_TYPE};
pub use value::{cast_to_shape, is_nil, nil_value, ObjectRef, Value};
