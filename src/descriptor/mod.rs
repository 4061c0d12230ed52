// Copyright 2025 Cowboy AI, LLC.

//! Descriptors for the inputs of composition
//!
//! Roles declare contracts, behaviours supply bodies, base types supply an
//! optional concrete ancestor, and the [`Catalog`] holds them all together
//! with the type and identifier hierarchies.

pub mod base;
pub mod behaviour;
pub mod catalog;
pub mod implementation;
pub mod role;
pub mod signature;

pub use base::{BaseMethod, BaseType};
pub use behaviour::{BehaviourBuilder, BehaviourDescriptor, BehaviourMethod, Precedence};
pub use catalog::{Catalog, IdentifierHierarchy};
pub use implementation::{
    BehaviourState, CallFrame, Constructor, ContinuingBody, Implementation, MessageBody,
    PlainBody, StateRef,
};
pub use role::{RoleBuilder, RoleDescriptor, RoleMethod};
pub use signature::{MethodSignature, Parameter};
