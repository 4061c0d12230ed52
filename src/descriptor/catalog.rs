// Copyright 2025 Cowboy AI, LLC.

//! Registry of everything a composition may reference

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

use super::base::BaseType;
use super::behaviour::BehaviourDescriptor;
use super::role::RoleDescriptor;
use crate::errors::{CompositionError, CompositionResult};
use crate::shape::{TypeHierarchy, TypeName};

/// "Is-subclass-of" relation among external method identifiers
///
/// A method whose identifier is an ancestor of another method's identifier
/// logically subsumes that method.
#[derive(Debug, Clone, Default)]
pub struct IdentifierHierarchy {
    parents: IndexMap<String, Vec<String>>,
}

impl IdentifierHierarchy {
    /// Create an empty relation
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `sub` as a specialisation of `sup`
    pub fn declare(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        let sup = sup.into();
        let entry = self.parents.entry(sub.into()).or_default();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
    }

    /// Whether `sub` is a strict descendant of `sup`
    pub fn is_strict_descendant(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return false;
        }
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut frontier = vec![sub];
        while let Some(current) = frontier.pop() {
            if let Some(parents) = self.parents.get(current) {
                for parent in parents {
                    if parent == sup {
                        return true;
                    }
                    if seen.insert(parent.as_str()) {
                        frontier.push(parent.as_str());
                    }
                }
            }
        }
        false
    }
}

/// Roles, behaviours, base types and the hierarchies relating them
///
/// The object-graph layer fills a catalog; the composer reads it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: TypeHierarchy,
    identifiers: IdentifierHierarchy,
    roles: IndexMap<String, Arc<RoleDescriptor>>,
    behaviours: IndexMap<String, Arc<BehaviourDescriptor>>,
    bases: IndexMap<String, Arc<BaseType>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plain object type
    pub fn register_type(&mut self, name: &str, supertypes: &[&str]) {
        self.types.declare(
            TypeName::new(name),
            supertypes.iter().map(|s| TypeName::new(*s)).collect(),
        );
    }

    /// Declare an identifier specialisation
    pub fn register_identifier(&mut self, sub: &str, sup: &str) {
        self.identifiers.declare(sub, sup);
    }

    /// Register a role; it also becomes an object type extending its parents
    pub fn register_role(&mut self, role: RoleDescriptor) -> CompositionResult<()> {
        if self.roles.contains_key(&role.name) {
            return Err(CompositionError::DuplicateName {
                kind: "Role".to_string(),
                name: role.name.clone(),
            });
        }
        self.types.declare(
            TypeName::new(role.name.clone()),
            role.parents.iter().map(|p| TypeName::new(p.clone())).collect(),
        );
        self.roles.insert(role.name.clone(), Arc::new(role));
        Ok(())
    }

    /// Register a behaviour
    pub fn register_behaviour(&mut self, behaviour: BehaviourDescriptor) -> CompositionResult<()> {
        if self.behaviours.contains_key(&behaviour.name) {
            return Err(CompositionError::DuplicateName {
                kind: "Behaviour".to_string(),
                name: behaviour.name.clone(),
            });
        }
        self.behaviours
            .insert(behaviour.name.clone(), Arc::new(behaviour));
        Ok(())
    }

    /// Register a base type; it also becomes an object type
    pub fn register_base(&mut self, base: BaseType) -> CompositionResult<()> {
        if self.bases.contains_key(&base.name) {
            return Err(CompositionError::DuplicateName {
                kind: "Base type".to_string(),
                name: base.name.clone(),
            });
        }
        self.types.declare(
            TypeName::new(base.name.clone()),
            base.supertypes.iter().map(|p| TypeName::new(p.clone())).collect(),
        );
        self.bases.insert(base.name.clone(), Arc::new(base));
        Ok(())
    }

    /// Look up a role
    pub fn role(&self, name: &str) -> CompositionResult<&Arc<RoleDescriptor>> {
        self.roles
            .get(name)
            .ok_or_else(|| CompositionError::UnknownRole(name.to_string()))
    }

    /// Look up a behaviour
    pub fn behaviour(&self, name: &str) -> CompositionResult<&Arc<BehaviourDescriptor>> {
        self.behaviours
            .get(name)
            .ok_or_else(|| CompositionError::UnknownBehaviour(name.to_string()))
    }

    /// Look up a base type
    pub fn base(&self, name: &str) -> CompositionResult<&Arc<BaseType>> {
        self.bases
            .get(name)
            .ok_or_else(|| CompositionError::UnknownBaseType(name.to_string()))
    }

    /// The object type hierarchy
    pub fn types(&self) -> &TypeHierarchy {
        &self.types
    }

    /// The identifier hierarchy
    pub fn identifiers(&self) -> &IdentifierHierarchy {
        &self.identifiers
    }
}
