// Copyright 2025 Cowboy AI, LLC.

//! Composite types and their instances
//!
//! A [`CompositeTypeDescriptor`] is the immutable result of one composition:
//! the role closure, the behaviour slots and the dispatch table. Instances
//! pair a descriptor with a target record and hold lazily created behaviour
//! state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::chain::{CandidateSource, ChainPlan, Convention, Dispatch, MethodEntry};
use crate::collation::{Collation, ExcludedBehaviour, MethodKey};
use crate::composer::CompositionKey;
use crate::context::{Continuation, InvocationContext, MessageContext};
use crate::descriptor::{
    BaseType, BehaviourState, CallFrame, Constructor, Implementation, PlainBody, StateRef,
};
use crate::errors::{CompositionError, CompositionResult, InvocationError, InvocationResult};
use crate::value::{cast_to_shape, nil_value, ObjectRef, Value};

/// A behaviour slot: one per instantiable behaviour
#[derive(Debug, Clone)]
pub struct BehaviourSlot {
    /// Behaviour name
    pub name: String,
    /// How the slot's state is built on first use
    pub constructor: Constructor,
}

/// Serializable view of a descriptor for diagnostics and snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSummary {
    /// Normalized request
    pub key: CompositionKey,
    /// Role closure, parents first
    pub roles: Vec<String>,
    /// Roles not implied by another member of the closure
    pub minimal_roles: Vec<String>,
    /// External identifiers of closure roles that declare one
    #[serde(default)]
    pub role_ids: BTreeMap<String, String>,
    /// Behaviour slots in index order
    pub slots: Vec<String>,
    /// Behaviours left out, with the reason
    pub excluded: Vec<String>,
    /// Dispatch table rows
    pub methods: Vec<MethodSummary>,
}

/// One row of [`CompositeSummary::methods`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    /// Rendered signature
    pub signature: String,
    /// Dispatch label: nil, direct, chain, message or bridge
    pub dispatch: String,
    /// Candidate sources in dispatch order
    pub candidates: Vec<String>,
}

/// An immutable composite type
pub struct CompositeTypeDescriptor {
    key: CompositionKey,
    base: Option<Arc<BaseType>>,
    roles: Vec<String>,
    role_ids: Vec<(String, String)>,
    minimal_roles: Vec<String>,
    slots: Vec<BehaviourSlot>,
    excluded: Vec<ExcludedBehaviour>,
    methods: IndexMap<MethodKey, MethodEntry>,
    forwarders: IndexMap<MethodKey, PlainBody>,
}

impl CompositeTypeDescriptor {
    pub(crate) fn assemble(
        key: CompositionKey,
        collation: Collation,
        plan: ChainPlan,
        base: Option<Arc<BaseType>>,
    ) -> CompositionResult<Self> {
        let slots = collation
            .behaviours
            .iter()
            .map(|behaviour| {
                let constructor = behaviour.constructor.clone().ok_or_else(|| {
                    CompositionError::Internal(format!(
                        "behaviour {} reached slot assembly without a constructor",
                        behaviour.name
                    ))
                })?;
                Ok(BehaviourSlot {
                    name: behaviour.name.clone(),
                    constructor,
                })
            })
            .collect::<CompositionResult<Vec<_>>>()?;

        Ok(Self {
            key,
            base,
            roles: collation.roles.iter().map(|r| r.name.clone()).collect(),
            role_ids: collation
                .roles
                .iter()
                .filter_map(|r| Some((r.name.clone(), r.external_id.clone()?)))
                .collect(),
            minimal_roles: collation.minimal_roles,
            slots,
            excluded: collation.excluded,
            methods: plan.methods,
            forwarders: plan.forwarders,
        })
    }

    /// Create an instance around a target record
    pub fn instantiate(self: &Arc<Self>, target: ObjectRef) -> CompositeInstance {
        CompositeInstance {
            descriptor: Arc::clone(self),
            target,
            id: Uuid::new_v4(),
            slots: RwLock::new(vec![None; self.slots.len()]),
        }
    }

    /// The request this descriptor was composed for
    pub fn key(&self) -> &CompositionKey {
        &self.key
    }

    /// Base type, if any
    pub fn base(&self) -> Option<&Arc<BaseType>> {
        self.base.as_ref()
    }

    /// Whether the role is in the composite's role closure
    pub fn implements(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether a role with this external identifier is in the closure
    pub fn implements_id(&self, external_id: &str) -> bool {
        self.role_ids.iter().any(|(_, id)| id == external_id)
    }

    /// Role closure, parents first
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Roles not implied by another member of the closure
    pub fn minimal_roles(&self) -> &[String] {
        &self.minimal_roles
    }

    /// Behaviour slots in index order
    pub fn slots(&self) -> &[BehaviourSlot] {
        &self.slots
    }

    /// Behaviours left out of composition
    pub fn excluded(&self) -> &[ExcludedBehaviour] {
        &self.excluded
    }

    /// One dispatch table row
    pub fn method(&self, key: &MethodKey) -> Option<&MethodEntry> {
        self.methods.get(key)
    }

    /// The whole dispatch table
    pub fn methods(&self) -> impl Iterator<Item = &MethodEntry> {
        self.methods.values()
    }

    /// Shared forwarder to an overridden base method
    pub fn forwarder(&self, key: &MethodKey) -> Option<&PlainBody> {
        self.forwarders.get(key)
    }

    /// Resolve a method by name and argument count
    ///
    /// Primary methods win over bridges; more than one primary is ambiguous.
    pub fn resolve(&self, name: &str, arity: usize) -> InvocationResult<&MethodKey> {
        let named: Vec<&MethodEntry> = self.methods.values().filter(|m| m.key.name == name).collect();
        let Some(first) = named.first() else {
            return Err(InvocationError::UnknownMethod(name.to_string()));
        };

        let matching: Vec<&MethodEntry> = named
            .iter()
            .copied()
            .filter(|m| m.signature.arity() == arity)
            .collect();
        if matching.is_empty() {
            return Err(InvocationError::ArityMismatch {
                method: name.to_string(),
                expected: first.signature.arity(),
                actual: arity,
            });
        }

        let primaries: Vec<&MethodEntry> = matching
            .iter()
            .copied()
            .filter(|m| !matches!(m.dispatch, Dispatch::Bridge { .. }))
            .collect();
        match (primaries.as_slice(), matching.as_slice()) {
            (&[only], _) | (&[], &[only]) => Ok(&only.key),
            _ => Err(InvocationError::AmbiguousMethod {
                method: name.to_string(),
                arity,
            }),
        }
    }

    /// Serializable view of the descriptor
    pub fn summary(&self) -> CompositeSummary {
        CompositeSummary {
            key: self.key.clone(),
            roles: self.roles.clone(),
            minimal_roles: self.minimal_roles.clone(),
            role_ids: self.role_ids.iter().cloned().collect(),
            slots: self.slots.iter().map(|s| s.name.clone()).collect(),
            excluded: self
                .excluded
                .iter()
                .map(|e| format!("{}: {}", e.name, e.reason))
                .collect(),
            methods: self
                .methods
                .values()
                .map(|entry| MethodSummary {
                    signature: entry.key.to_string(),
                    dispatch: entry.dispatch.label().to_string(),
                    candidates: entry
                        .dispatch
                        .candidates()
                        .iter()
                        .map(|c| c.source.to_string())
                        .collect(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for CompositeTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeTypeDescriptor")
            .field("key", &self.key)
            .field("roles", &self.roles)
            .field("slots", &self.slots.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// A live composite object
pub struct CompositeInstance {
    descriptor: Arc<CompositeTypeDescriptor>,
    target: ObjectRef,
    id: Uuid,
    slots: RwLock<Vec<Option<BehaviourState>>>,
}

impl CompositeInstance {
    /// The composite type
    pub fn descriptor(&self) -> &Arc<CompositeTypeDescriptor> {
        &self.descriptor
    }

    /// The target record
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Instance identity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the composite's type implements a role
    pub fn implements(&self, role: &str) -> bool {
        self.descriptor.implements(role)
    }

    /// Number of behaviour slots constructed so far
    pub fn initialized_slots(&self) -> usize {
        self.slots
            .read()
            .map(|slots| slots.iter().filter(|s| s.is_some()).count())
            .unwrap_or(0)
    }

    /// State of a behaviour slot, constructing it on first use
    ///
    /// The constructor runs at most once per instance even under concurrent
    /// first use. It runs under the slot lock and must not call back into
    /// this instance.
    pub fn slot(&self, index: usize) -> InvocationResult<BehaviourState> {
        {
            let slots = self.slots.read().map_err(|_| poisoned())?;
            if let Some(Some(state)) = slots.get(index) {
                return Ok(Arc::clone(state));
            }
        }

        let spec = self.descriptor.slots.get(index).ok_or_else(|| {
            InvocationError::Internal(format!("no behaviour slot at index {index}"))
        })?;

        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        let entry = slots.get_mut(index).ok_or_else(|| {
            InvocationError::Internal(format!("no behaviour slot at index {index}"))
        })?;
        if let Some(state) = entry.as_ref() {
            return Ok(Arc::clone(state));
        }

        let state = spec
            .constructor
            .construct(&self.target)
            .map_err(|e| InvocationError::SlotConstruction {
                behaviour: spec.name.clone(),
                reason: e.to_string(),
            })?;
        debug!(instance = %self.id, behaviour = %spec.name, "Constructed behaviour slot");
        *entry = Some(Arc::clone(&state));
        Ok(state)
    }

    /// State a candidate runs with
    pub fn state_for(&self, source: &CandidateSource) -> InvocationResult<Option<BehaviourState>> {
        match source {
            CandidateSource::Behaviour { slot, .. } => self.slot(*slot).map(Some),
            CandidateSource::This { .. } | CandidateSource::Super { .. } => Ok(None),
        }
    }

    /// Call a method by name, resolving the overload by argument count
    pub fn invoke(&self, name: &str, arguments: Vec<Value>) -> InvocationResult<Value> {
        let key = self.descriptor.resolve(name, arguments.len())?;
        self.invoke_key(key, arguments)
    }

    /// Call a specific overload
    pub fn invoke_key(&self, key: &MethodKey, arguments: Vec<Value>) -> InvocationResult<Value> {
        let entry = self
            .descriptor
            .method(key)
            .ok_or_else(|| InvocationError::UnknownMethod(key.to_string()))?;
        let expected = entry.signature.arity();
        if arguments.len() != expected {
            return Err(InvocationError::ArityMismatch {
                method: entry.key.name.clone(),
                expected,
                actual: arguments.len(),
            });
        }
        self.dispatch(entry, arguments)
    }

    fn dispatch(&self, entry: &MethodEntry, arguments: Vec<Value>) -> InvocationResult<Value> {
        let returns = &entry.signature.returns;
        trace!(instance = %self.id, method = %entry.key, dispatch = entry.dispatch.label(), "Dispatching");

        let value = match &entry.dispatch {
            Dispatch::Nil => nil_value(returns),
            Dispatch::Direct(candidate) => {
                let Implementation::Plain(body) = &candidate.implementation else {
                    return Err(InvocationError::Internal(format!(
                        "direct dispatch of {} requires a plain body",
                        entry.key
                    )));
                };
                let state = self.state_for(&candidate.source)?;
                let frame = CallFrame::new(&self.target, StateRef::new(state.as_deref()), &arguments);
                cast_to_shape(body(&frame)?, returns)
            }
            Dispatch::Chained {
                candidates,
                convention: Convention::Chain,
            } => InvocationContext::new(self, entry, candidates, arguments).proceed()?,
            Dispatch::Chained {
                candidates,
                convention: Convention::Message,
            } => MessageContext::new(self, entry, candidates, arguments).proceed()?,
            Dispatch::Bridge { primary } => {
                let primary = self.descriptor.method(primary).ok_or_else(|| {
                    InvocationError::Internal(format!("bridge target {primary} is missing"))
                })?;
                cast_to_shape(self.dispatch(primary, arguments)?, returns)
            }
        };

        Ok(cast_to_shape(value, returns))
    }
}

impl fmt::Debug for CompositeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeInstance")
            .field("id", &self.id)
            .field("key", &self.descriptor.key)
            .field("target", &self.target)
            .finish()
    }
}

fn poisoned() -> InvocationError {
    InvocationError::Internal("behaviour slot lock poisoned".to_string())
}
