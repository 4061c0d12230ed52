// Copyright 2025 Cowboy AI, LLC.

//! Chain building: from collated methods to dispatch entries
//!
//! Each method gets an ordered candidate list (its own linearized
//! behaviours, the role default body, the base-type body, then the lists of
//! the methods it subsumes) and a dispatch strategy chosen from that list.

use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::collation::{CollatedMethod, Collation, MethodKey};
use crate::config::ComposerConfig;
use crate::descriptor::{
    BaseType, CallFrame, Catalog, Implementation, MethodSignature, PlainBody,
};
use crate::errors::{CompositionError, CompositionResult};
use crate::ordering::{Linearizer, PrecedenceNode};
use crate::shape::Shape;

/// Where a candidate's body comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// A behaviour slot
    Behaviour {
        /// Slot index on the composite
        slot: usize,
        /// Behaviour name
        name: String,
    },
    /// The role's own default body
    This {
        /// Declaring role
        role: String,
    },
    /// The base type's body, through its forwarder
    Super {
        /// Base type name
        base: String,
    },
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Behaviour { name, .. } => write!(f, "behaviour:{name}"),
            CandidateSource::This { role } => write!(f, "this:{role}"),
            CandidateSource::Super { base } => write!(f, "super:{base}"),
        }
    }
}

/// One (source, implementation) pair considered during dispatch
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Where the body comes from
    pub source: CandidateSource,
    /// The body
    pub implementation: Implementation,
    /// Return shape the body was declared with
    pub returns: Shape,
    /// Method the candidate was gathered for (differs for subsumed methods)
    pub origin: MethodKey,
}

/// Calling convention of a chained dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Generic chain context
    Chain,
    /// Structured message context
    Message,
}

/// How a composite method runs
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// No candidates: always the nil value
    Nil,
    /// A single exactly matching plain body, called without a context
    Direct(Candidate),
    /// An ordered chain walked through an invocation context
    Chained {
        /// Ordered candidates
        candidates: Arc<[Candidate]>,
        /// Context variant to use
        convention: Convention,
    },
    /// Forward to a more specific overload and widen its result
    Bridge {
        /// The primary overload
        primary: MethodKey,
    },
}

impl Dispatch {
    /// Short label for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Dispatch::Nil => "nil",
            Dispatch::Direct(_) => "direct",
            Dispatch::Chained {
                convention: Convention::Chain,
                ..
            } => "chain",
            Dispatch::Chained {
                convention: Convention::Message,
                ..
            } => "message",
            Dispatch::Bridge { .. } => "bridge",
        }
    }

    /// Candidates in dispatch order
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Dispatch::Direct(candidate) => std::slice::from_ref(candidate),
            Dispatch::Chained { candidates, .. } => candidates,
            Dispatch::Nil | Dispatch::Bridge { .. } => &[],
        }
    }
}

/// One row of the composite's dispatch table
#[derive(Debug, Clone)]
pub struct MethodEntry {
    /// Collation identity
    pub key: MethodKey,
    /// Declared signature
    pub signature: MethodSignature,
    /// Dispatch strategy
    pub dispatch: Dispatch,
}

/// Output of chain building
pub struct ChainPlan {
    /// Dispatch table
    pub methods: IndexMap<MethodKey, MethodEntry>,
    /// Forwarders to base-type bodies, one per overridden base method
    pub forwarders: IndexMap<MethodKey, PlainBody>,
}

/// Builds dispatch entries from a collation
pub struct ChainBuilder<'a> {
    catalog: &'a Catalog,
    config: &'a ComposerConfig,
    linearizer: Linearizer,
    forwarders: IndexMap<MethodKey, PlainBody>,
}

impl<'a> ChainBuilder<'a> {
    /// Builder over a catalog
    pub fn new(catalog: &'a Catalog, config: &'a ComposerConfig) -> Self {
        Self {
            catalog,
            config,
            linearizer: Linearizer::from_config(config),
            forwarders: IndexMap::new(),
        }
    }

    /// Build the dispatch table for a collation
    pub fn build(
        mut self,
        collation: &Collation,
        base: Option<&Arc<BaseType>>,
    ) -> CompositionResult<ChainPlan> {
        let mut own: IndexMap<MethodKey, Vec<Candidate>> = IndexMap::new();
        let behaviour_nodes = self.behaviour_candidates(collation)?;

        for (key, method) in &collation.methods {
            if method.is_bridge() {
                continue;
            }
            let nodes = behaviour_nodes.get(key).cloned().unwrap_or_default();
            let ordered = self.linearizer.linearize(&key.to_string(), nodes)?;
            let mut list: Vec<Candidate> = ordered.into_iter().map(|n| n.payload).collect();

            if let Some(body) = &method.default_body {
                list.push(Candidate {
                    source: CandidateSource::This {
                        role: method.role.clone(),
                    },
                    implementation: body.clone(),
                    returns: method.signature.returns.clone(),
                    origin: key.clone(),
                });
            }

            if let Some(base) = base {
                if let Some(candidate) = self.super_candidate(base, method) {
                    list.push(candidate);
                }
            }

            own.insert(key.clone(), list);
        }

        let mut methods = IndexMap::new();
        for (key, method) in &collation.methods {
            let dispatch = match &method.bridges_to {
                Some(primary) => Dispatch::Bridge {
                    primary: primary.clone(),
                },
                None => {
                    let mut visited = IndexSet::new();
                    let mut candidates = Vec::new();
                    self.gather(collation, &own, key, &mut visited, &mut candidates);
                    decide(&method.signature, candidates)
                }
            };
            debug!(method = %key, dispatch = dispatch.label(), candidates = dispatch.candidates().len(), "Built dispatch entry");
            methods.insert(
                key.clone(),
                MethodEntry {
                    key: key.clone(),
                    signature: method.signature.clone(),
                    dispatch,
                },
            );
        }

        if let Some(base) = base {
            self.base_only_methods(base, collation, &mut methods);
        }

        Ok(ChainPlan {
            methods,
            forwarders: self.forwarders,
        })
    }

    /// Behaviour bodies grouped by the method they implement
    fn behaviour_candidates(
        &self,
        collation: &Collation,
    ) -> CompositionResult<IndexMap<MethodKey, Vec<PrecedenceNode<Candidate>>>> {
        let types = self.catalog.types();
        let mut grouped: IndexMap<MethodKey, Vec<PrecedenceNode<Candidate>>> = IndexMap::new();

        for (slot, behaviour) in collation.behaviours.iter().enumerate() {
            for method in &behaviour.methods {
                let signature = &method.signature;
                let targets: Vec<&CollatedMethod> = collation
                    .methods
                    .values()
                    .filter(|m| !m.is_bridge() && m.signature.same_call_shape(signature))
                    .collect();

                let matched = targets
                    .iter()
                    .find(|m| m.key.returns == signature.returns)
                    .or_else(|| {
                        targets
                            .iter()
                            .find(|m| types.is_assignable(&signature.returns, &m.key.returns))
                    });

                let Some(target) = matched else {
                    if targets.is_empty() {
                        debug!(behaviour = %behaviour.name, method = %signature, "Body matches no composed method");
                        continue;
                    }
                    if self.config.strict_shapes {
                        return Err(CompositionError::UnresolvableShape {
                            method: signature.name.clone(),
                            detail: format!(
                                "{} in behaviour {} returns a shape no overload accepts",
                                signature, behaviour.name
                            ),
                        });
                    }
                    warn!(behaviour = %behaviour.name, method = %signature, "Skipping body with incompatible return shape");
                    continue;
                };

                let nodes = grouped.entry(target.key.clone()).or_default();
                if nodes.iter().any(|n| n.name == behaviour.name) {
                    debug!(behaviour = %behaviour.name, method = %target.key, "Ignoring second body for the same method");
                    continue;
                }
                nodes.push(PrecedenceNode {
                    name: behaviour.name.clone(),
                    precedence: behaviour.precedence_for(method),
                    message_style: behaviour.is_message_style(),
                    payload: Candidate {
                        source: CandidateSource::Behaviour {
                            slot,
                            name: behaviour.name.clone(),
                        },
                        implementation: method.implementation.clone(),
                        returns: signature.returns.clone(),
                        origin: target.key.clone(),
                    },
                });
            }
        }
        Ok(grouped)
    }

    /// Base-type candidate for a method, through a memoized forwarder
    fn super_candidate(&mut self, base: &BaseType, method: &CollatedMethod) -> Option<Candidate> {
        let types = self.catalog.types();
        let overridden = base.methods.iter().find(|b| {
            !b.is_abstract()
                && b.signature.same_call_shape(&method.signature)
                && types.is_assignable(&b.signature.returns, &method.signature.returns)
        })?;
        let forwarder = self.forwarder(overridden.signature.clone(), overridden.body.clone()?);
        Some(Candidate {
            source: CandidateSource::Super {
                base: base.name.clone(),
            },
            implementation: Implementation::Plain(forwarder),
            returns: overridden.signature.returns.clone(),
            origin: method.key.clone(),
        })
    }

    fn forwarder(&mut self, signature: MethodSignature, body: PlainBody) -> PlainBody {
        let key = MethodKey::of(&signature);
        self.forwarders
            .entry(key)
            .or_insert_with(|| {
                debug!(method = %signature, "Created base forwarder");
                let forwarder: PlainBody = Arc::new(move |frame: &CallFrame<'_>| body(frame));
                forwarder
            })
            .clone()
    }

    /// Own candidates of `key`, then those of every method it subsumes
    fn gather(
        &self,
        collation: &Collation,
        own: &IndexMap<MethodKey, Vec<Candidate>>,
        key: &MethodKey,
        visited: &mut IndexSet<MethodKey>,
        out: &mut Vec<Candidate>,
    ) {
        if !visited.insert(key.clone()) {
            return;
        }
        for candidate in own.get(key).into_iter().flatten() {
            let duplicate = out
                .iter()
                .any(|c| c.source == candidate.source && c.origin == candidate.origin);
            if !duplicate {
                out.push(candidate.clone());
            }
        }

        let Some(parent_id) = collation
            .methods
            .get(key)
            .and_then(|m| m.signature.external_id.as_deref())
        else {
            return;
        };

        let identifiers = self.catalog.identifiers();
        let subsumed: Vec<&MethodKey> = collation
            .methods
            .values()
            .filter(|m| !m.is_bridge())
            .filter(|m| {
                m.signature
                    .external_id
                    .as_deref()
                    .is_some_and(|id| identifiers.is_strict_descendant(id, parent_id))
            })
            .map(|m| &m.key)
            .collect();

        for sub in subsumed {
            self.gather(collation, own, sub, visited, out);
        }
    }

    /// Concrete base methods no role declares stay callable on the composite
    fn base_only_methods(
        &mut self,
        base: &BaseType,
        collation: &Collation,
        methods: &mut IndexMap<MethodKey, MethodEntry>,
    ) {
        for base_method in &base.methods {
            let Some(body) = base_method.body.clone() else {
                continue;
            };
            let declared = collation
                .methods
                .values()
                .any(|m| m.signature.same_call_shape(&base_method.signature));
            if declared || base_method.signature.is_static {
                continue;
            }
            let key = MethodKey::of(&base_method.signature);
            let forwarder = self.forwarder(base_method.signature.clone(), body);
            methods.insert(
                key.clone(),
                MethodEntry {
                    key: key.clone(),
                    signature: base_method.signature.clone(),
                    dispatch: Dispatch::Direct(Candidate {
                        source: CandidateSource::Super {
                            base: base.name.clone(),
                        },
                        implementation: Implementation::Plain(forwarder),
                        returns: base_method.signature.returns.clone(),
                        origin: key,
                    }),
                },
            );
        }
    }
}

/// Pick the dispatch strategy for a gathered candidate list
fn decide(signature: &MethodSignature, candidates: Vec<Candidate>) -> Dispatch {
    if candidates.is_empty() {
        return Dispatch::Nil;
    }

    let direct = candidates.len() == 1
        && !candidates[0].implementation.is_continuation_aware()
        && candidates[0].returns == signature.returns;
    if direct {
        return Dispatch::Direct(candidates[0].clone());
    }

    let convention = if candidates.iter().any(|c| c.implementation.is_message()) {
        Convention::Message
    } else {
        Convention::Chain
    };
    Dispatch::Chained {
        candidates: candidates.into(),
        convention,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collation::Collator;
    use crate::descriptor::{BehaviourDescriptor, RoleDescriptor};
    use crate::shape::Shape;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn sources(entry: &MethodEntry) -> Vec<String> {
        entry
            .dispatch
            .candidates()
            .iter()
            .map(|c| c.source.to_string())
            .collect()
    }

    fn plan(catalog: &Catalog, roles: &[&str], behaviours: &[&str], base: Option<&str>) -> ChainPlan {
        let config = ComposerConfig::default();
        let roles: Vec<String> = roles.iter().map(|s| s.to_string()).collect();
        let behaviours: Vec<String> = behaviours.iter().map(|s| s.to_string()).collect();
        let collation = Collator::new(catalog, &config)
            .collate(&roles, &behaviours)
            .unwrap();
        let base = base.map(|b| catalog.base(b).unwrap().clone());
        ChainBuilder::new(catalog, &config)
            .build(&collation, base.as_ref())
            .unwrap()
    }

    fn shape_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register_role(
                RoleDescriptor::builder("Shape")
                    .method(MethodSignature::new("area", Shape::Double))
                    .method(MethodSignature::new("label", Shape::Text))
                    .default_method(
                        MethodSignature::new("sides", Shape::Int),
                        Implementation::plain(|_| Ok(Value::Int(0))),
                    )
                    .build(),
            )
            .unwrap();
        catalog
            .register_behaviour(
                BehaviourDescriptor::builder("Circle")
                    .stateless()
                    .plain(MethodSignature::new("area", Shape::Double), |_| Ok(Value::Double(3.0)))
                    .build(),
            )
            .unwrap();
        catalog
            .register_behaviour(
                BehaviourDescriptor::builder("Audit")
                    .stateless()
                    .runs_after("Circle")
                    .continuing(MethodSignature::new("area", Shape::Double), |_, chain| chain.proceed())
                    .build(),
            )
            .unwrap();
        catalog
            .register_base(
                BaseType::new("Record")
                    .concrete(MethodSignature::new("area", Shape::Double), |_| Ok(Value::Double(1.0)))
                    .concrete(MethodSignature::new("id", Shape::Text), |_| Ok(Value::text("r1")))
                    .abstract_method(MethodSignature::new("label", Shape::Text)),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_single_exact_plain_body_is_direct() {
        let catalog = shape_catalog();
        let plan = plan(&catalog, &["Shape"], &["Circle"], None);
        let area = &plan.methods[&MethodKey::new("area", Shape::Double, vec![])];
        assert_eq!(area.dispatch.label(), "direct");
        let label = &plan.methods[&MethodKey::new("label", Shape::Text, vec![])];
        assert_eq!(label.dispatch.label(), "nil");
    }

    #[test]
    fn test_continuing_body_forces_chain() {
        let catalog = shape_catalog();
        let plan = plan(&catalog, &["Shape"], &["Audit", "Circle"], Some("Record"));
        let area = &plan.methods[&MethodKey::new("area", Shape::Double, vec![])];
        assert_eq!(area.dispatch.label(), "chain");
        assert_eq!(
            sources(area),
            vec!["behaviour:Circle", "behaviour:Audit", "super:Record"]
        );
    }

    #[test]
    fn test_role_default_body_is_this_candidate() {
        let catalog = shape_catalog();
        let plan = plan(&catalog, &["Shape"], &[], None);
        let sides = &plan.methods[&MethodKey::new("sides", Shape::Int, vec![])];
        assert_eq!(sources(sides), vec!["this:Shape"]);
    }

    #[test]
    fn test_abstract_base_method_is_not_a_candidate() {
        let catalog = shape_catalog();
        let plan = plan(&catalog, &["Shape"], &[], Some("Record"));
        let label = &plan.methods[&MethodKey::new("label", Shape::Text, vec![])];
        assert_eq!(label.dispatch.label(), "nil");
    }

    #[test]
    fn test_base_only_methods_and_forwarder_memo() {
        let catalog = shape_catalog();
        let plan = plan(&catalog, &["Shape"], &["Circle"], Some("Record"));
        let id = &plan.methods[&MethodKey::new("id", Shape::Text, vec![])];
        assert_eq!(sources(id), vec!["super:Record"]);
        assert_eq!(plan.forwarders.len(), 2);
    }

    #[test]
    fn test_subsumed_methods_append_candidates() {
        let mut catalog = Catalog::new();
        catalog.register_identifier("firstName", "name");
        catalog
            .register_role(
                RoleDescriptor::builder("Person")
                    .method(MethodSignature::new("names", Shape::set_of(Shape::Text)).with_external_id("name"))
                    .method(MethodSignature::new("first_name", Shape::Text).with_external_id("firstName"))
                    .build(),
            )
            .unwrap();
        catalog
            .register_behaviour(
                BehaviourDescriptor::builder("Given")
                    .stateless()
                    .plain(MethodSignature::new("first_name", Shape::Text), |_| Ok(Value::text("Ada")))
                    .build(),
            )
            .unwrap();
        let plan = plan(&catalog, &["Person"], &["Given"], None);
        let names = &plan.methods[&MethodKey::new("names", Shape::set_of(Shape::Text), vec![])];
        assert_eq!(names.dispatch.label(), "chain");
        assert_eq!(sources(names), vec!["behaviour:Given"]);
        let first = &plan.methods[&MethodKey::new("first_name", Shape::Text, vec![])];
        assert_eq!(first.dispatch.label(), "direct");
    }

    #[test]
    fn test_strict_shapes_rejects_incompatible_body() {
        let mut catalog = Catalog::new();
        catalog
            .register_role(
                RoleDescriptor::builder("Counter")
                    .method(MethodSignature::new("count", Shape::Int))
                    .build(),
            )
            .unwrap();
        catalog
            .register_behaviour(
                BehaviourDescriptor::builder("Texty")
                    .stateless()
                    .plain(MethodSignature::new("count", Shape::Text), |_| Ok(Value::text("1")))
                    .build(),
            )
            .unwrap();
        let config = ComposerConfig {
            strict_shapes: true,
            ..ComposerConfig::default()
        };
        let collation = Collator::new(&catalog, &config)
            .collate(&["Counter".to_string()], &["Texty".to_string()])
            .unwrap();
        let err = ChainBuilder::new(&catalog, &config)
            .build(&collation, None)
            .err()
            .unwrap();
        assert!(matches!(err, CompositionError::UnresolvableShape { .. }));
    }
}
