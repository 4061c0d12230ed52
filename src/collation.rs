// Copyright 2025 Cowboy AI, LLC.

//! Role and method collation
//!
//! Gathers the role and behaviour closures for a request, deduplicates the
//! methods the composite must implement and collapses covariant-return
//! overloads into a primary method plus bridges.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ComposerConfig;
use crate::descriptor::{
    BehaviourDescriptor, Catalog, Implementation, MethodSignature, RoleDescriptor,
};
use crate::errors::{CompositionError, CompositionResult};
use crate::ordering::linear_extension;
use crate::shape::{Shape, TypeName};

/// Collation identity of a method: name, return shape and parameter shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    /// Method name
    pub name: String,
    /// Return shape
    pub returns: Shape,
    /// Parameter shape (the fixed override when declared)
    pub parameters: Vec<Shape>,
}

impl MethodKey {
    /// Build a key directly
    pub fn new(name: impl Into<String>, returns: Shape, parameters: Vec<Shape>) -> Self {
        Self {
            name: name.into(),
            returns,
            parameters,
        }
    }

    /// Key of a signature
    pub fn of(signature: &MethodSignature) -> Self {
        Self {
            name: signature.name.clone(),
            returns: signature.returns.clone(),
            parameters: signature.parameter_shape(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|s| s.to_string()).collect();
        write!(f, "{}({}): {}", self.name, params.join(", "), self.returns)
    }
}

/// A method the composite implements
#[derive(Debug, Clone)]
pub struct CollatedMethod {
    /// Collation identity
    pub key: MethodKey,
    /// Winning declaration
    pub signature: MethodSignature,
    /// Role that declared the winning signature
    pub role: String,
    /// Role default body, if the winner has one
    pub default_body: Option<Implementation>,
    /// Set when this method only forwards to a more specific overload
    pub bridges_to: Option<MethodKey>,
}

impl CollatedMethod {
    /// Whether this method is a bridge
    pub fn is_bridge(&self) -> bool {
        self.bridges_to.is_some()
    }
}

/// A behaviour left out of composition, with the reason
#[derive(Debug, Clone)]
pub struct ExcludedBehaviour {
    /// Behaviour name
    pub name: String,
    /// Why it was excluded
    pub reason: CompositionError,
}

/// Everything the chain builder needs from collation
#[derive(Debug, Clone)]
pub struct Collation {
    /// Role closure, parents before children
    pub roles: Vec<Arc<RoleDescriptor>>,
    /// Closure members that are not an ancestor of another member
    pub minimal_roles: Vec<String>,
    /// Instantiable behaviours, required ones first; the index is the slot
    pub behaviours: Vec<Arc<BehaviourDescriptor>>,
    /// Behaviours dropped because they cannot be instantiated
    pub excluded: Vec<ExcludedBehaviour>,
    /// Methods to implement, in closure order
    pub methods: IndexMap<MethodKey, CollatedMethod>,
}

/// Collates roles and behaviours from a catalog
pub struct Collator<'a> {
    catalog: &'a Catalog,
    config: &'a ComposerConfig,
}

impl<'a> Collator<'a> {
    /// Collator over a catalog
    pub fn new(catalog: &'a Catalog, config: &'a ComposerConfig) -> Self {
        Self { catalog, config }
    }

    /// Collate a normalized role-set and behaviour-set
    pub fn collate(&self, roles: &[String], behaviours: &[String]) -> CompositionResult<Collation> {
        let (behaviours, excluded) = self.behaviour_closure(behaviours)?;

        let mut requested: Vec<String> = roles.to_vec();
        for behaviour in &behaviours {
            requested.extend(behaviour.provides.iter().cloned());
        }
        let roles = self.role_closure(&requested)?;
        let minimal_roles = self.minimal_roles(&roles);
        let methods = self.collate_methods(&roles);

        debug!(
            roles = roles.len(),
            behaviours = behaviours.len(),
            methods = methods.len(),
            "Collated composition"
        );

        Ok(Collation {
            roles,
            minimal_roles,
            behaviours,
            excluded,
            methods,
        })
    }

    fn behaviour_closure(
        &self,
        requested: &[String],
    ) -> CompositionResult<(Vec<Arc<BehaviourDescriptor>>, Vec<ExcludedBehaviour>)> {
        let mut found: IndexMap<String, Arc<BehaviourDescriptor>> = IndexMap::new();
        let mut frontier: Vec<String> = requested.iter().rev().cloned().collect();
        while let Some(name) = frontier.pop() {
            if found.contains_key(&name) {
                continue;
            }
            let behaviour = self.catalog.behaviour(&name)?.clone();
            frontier.extend(behaviour.requires.iter().rev().cloned());
            found.insert(name, behaviour);
        }

        let names: Vec<String> = found.keys().cloned().collect();
        let ordered = linear_extension(&names, |name| {
            found
                .values()
                .filter(|b| b.requires.contains(name))
                .map(|b| b.name.clone())
                .collect::<Vec<_>>()
        })
        .map_err(|cycle| CompositionError::CyclicBehaviours(cycle.unresolved))?;

        let mut usable = Vec::new();
        let mut excluded = Vec::new();
        for name in ordered {
            let behaviour = found[&name].clone();
            if behaviour.constructor.is_none() {
                warn!(behaviour = %name, "Excluding behaviour without a usable constructor");
                excluded.push(ExcludedBehaviour {
                    name: name.clone(),
                    reason: CompositionError::MissingConstructor { behaviour: name },
                });
            } else {
                usable.push(behaviour);
            }
        }
        Ok((usable, excluded))
    }

    fn role_closure(&self, requested: &[String]) -> CompositionResult<Vec<Arc<RoleDescriptor>>> {
        let mut found: IndexMap<String, Arc<RoleDescriptor>> = IndexMap::new();
        let mut frontier: Vec<String> = requested.iter().rev().cloned().collect();
        while let Some(name) = frontier.pop() {
            if found.contains_key(&name) {
                continue;
            }
            let role = self.catalog.role(&name)?.clone();
            frontier.extend(role.parents.iter().rev().cloned());
            found.insert(name, role);
        }

        let names: Vec<String> = found.keys().cloned().collect();
        let ordered = linear_extension(&names, |name| {
            found
                .values()
                .filter(|r| r.parents.contains(name))
                .map(|r| r.name.clone())
                .collect::<Vec<_>>()
        })
        .map_err(|cycle| CompositionError::CyclicRoles(cycle.unresolved))?;

        Ok(ordered.into_iter().map(|name| found[&name].clone()).collect())
    }

    fn minimal_roles(&self, roles: &[Arc<RoleDescriptor>]) -> Vec<String> {
        let types = self.catalog.types();
        roles
            .iter()
            .filter(|candidate| {
                let ancestor = TypeName::new(candidate.name.clone());
                !roles.iter().any(|other| {
                    other.name != candidate.name
                        && types.is_subtype(&TypeName::new(other.name.clone()), &ancestor)
                })
            })
            .map(|r| r.name.clone())
            .collect()
    }

    fn collate_methods(&self, roles: &[Arc<RoleDescriptor>]) -> IndexMap<MethodKey, CollatedMethod> {
        let mut methods: IndexMap<MethodKey, CollatedMethod> = IndexMap::new();

        for role in roles {
            for method in &role.methods {
                let signature = &method.signature;
                if signature.is_static || signature.is_bridge || self.config.is_universal(signature) {
                    debug!(role = %role.name, method = %signature, "Skipping non-composable method");
                    continue;
                }

                let key = MethodKey::of(signature);
                let candidate = CollatedMethod {
                    key: key.clone(),
                    signature: signature.clone(),
                    role: role.name.clone(),
                    default_body: method.default_body.clone(),
                    bridges_to: None,
                };

                match methods.get_mut(&key) {
                    Some(existing) if signature.rank() > existing.signature.rank() => {
                        debug!(method = %key, winner = %role.name, "Replacing lower ranked declaration");
                        *existing = candidate;
                    }
                    Some(_) => {}
                    None => {
                        methods.insert(key, candidate);
                    }
                }
            }
        }

        self.resolve_bridges(&mut methods);
        methods
    }

    fn resolve_bridges(&self, methods: &mut IndexMap<MethodKey, CollatedMethod>) {
        let types = self.catalog.types();
        let keys: Vec<MethodKey> = methods.keys().cloned().collect();

        // (name, parameters) groups in first-seen order
        let mut groups: IndexMap<(String, Vec<Shape>), Vec<MethodKey>> = IndexMap::new();
        for key in &keys {
            groups
                .entry((key.name.clone(), key.parameters.clone()))
                .or_default()
                .push(key.clone());
        }

        for members in groups.values().filter(|m| m.len() > 1) {
            for wide in members {
                let narrower: Vec<&MethodKey> = members
                    .iter()
                    .filter(|narrow| {
                        narrow.returns != wide.returns
                            && types.is_assignable(&narrow.returns, &wide.returns)
                    })
                    .collect();

                let leaves: IndexSet<&MethodKey> = narrower
                    .iter()
                    .copied()
                    .filter(|candidate| {
                        !members.iter().any(|other| {
                            other.returns != candidate.returns
                                && types.is_assignable(&other.returns, &candidate.returns)
                        })
                    })
                    .collect();

                if let Some(primary) = leaves.first() {
                    if leaves.len() > 1 {
                        debug!(method = %wide, primary = %primary, "Several narrower overloads; bridging to the first");
                    }
                    let primary = (*primary).clone();
                    if let Some(bridge) = methods.get_mut(wide) {
                        debug!(bridge = %wide, primary = %primary, "Collapsed covariant overload");
                        bridge.bridges_to = Some(primary);
                    }
                }
            }
        }
    }
}
